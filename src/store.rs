//! The container-format API the dataset operations are built on.
//!
//! [`Backend`] is a handle-based interface in the style of a hierarchical
//! array library: every opened container, object, dataspace, datatype and
//! attribute is an opaque [`Hid`] that must be [closed](Backend::close).
//! [`ZarrBackend`] implements it on a Zarr V3 hierarchy in a directory.
//!
//! # Layout
//!
//! A container is the root group of a Zarr hierarchy, groups are Zarr groups
//! and datasets are Zarr arrays with their elements in native byte order.
//! Contiguous datasets are arrays of a single chunk. The maximum extent is
//! kept in the reserved array attribute `hslab` as `{"maxshape": [..]}`
//! with `null` for unlimited axes; rank-0 datasets are arrays of shape `[1]`
//! with an empty `maxshape`. Arrays without it are fixed. Attributes are
//! plain JSON values in the node metadata.
mod attrs;
mod convert;
mod space;

use self::{
    attrs::{from_json, to_json},
    convert::{convert_element, convertible},
    space::{Dataspace, Selection},
};
use crate::{
    config::global_config,
    dtype::{ByteOrder, Datatype},
    order::StoreVec,
    selection::{Bound, Hyperslab},
};
use num_complex::Complex;
use serde_json::{json, Map, Value};
use std::{collections::HashMap, fmt, ops::Range, path::Path, sync::Arc};
use thiserror::Error;
use zarrs::{
    array::{Array, ArrayBuilder, ArrayCreateError, ArrayError, ChunkGrid, DataType, FillValue},
    array_subset::ArraySubset,
    filesystem::{FilesystemStore, FilesystemStoreCreateError},
    group::{Group, GroupBuilder, GroupCreateError},
    storage::{ReadableStorageTraits, StorageError, StoreKey, StorePrefix, WritableStorageTraits},
};

const META_KEY: &str = "zarr.json";
const LAYOUT_ATTR: &str = "hslab";

/// An opaque handle to an open store resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hid(u64);

impl fmt::Display for Hid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An error reported by a store primitive.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The container directory cannot be used as a store.
    #[error("error opening store: {0}")]
    OpenStore(#[from] FilesystemStoreCreateError),
    /// An error of the underlying key-value store.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Array metadata could not be created or read.
    #[error("array error: {0}")]
    ArrayCreate(#[from] ArrayCreateError),
    /// Group metadata could not be created or read.
    #[error("group error: {0}")]
    GroupCreate(#[from] GroupCreateError),
    /// Array elements could not be transferred.
    #[error("array transfer error: {0}")]
    Array(#[from] ArrayError),
    /// Node metadata is malformed.
    #[error("invalid node metadata: {0}")]
    Metadata(String),
    /// The handle is not open.
    #[error("invalid handle {0}")]
    InvalidHandle(Hid),
    /// The handle refers to the wrong kind of resource.
    #[error("handle {hid} is not a {expected}")]
    WrongHandleKind {
        /// The handle.
        hid: Hid,
        /// What was expected.
        expected: &'static str,
    },
    /// No object or attribute of that name.
    #[error("{0} not found")]
    NotFound(String),
    /// The object is a group.
    #[error("{0} is not a dataset")]
    NotADataset(String),
    /// An object or attribute of that name already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// The name cannot be used for an object.
    #[error("invalid object name {0:?}")]
    InvalidName(String),
    /// The container was opened read-only.
    #[error("the container is opened read-only")]
    ReadOnly,
    /// The dataset layout forbids the request.
    #[error("layout error: {0}")]
    Layout(String),
    /// The dataspaces do not describe a valid transfer.
    #[error("selection error: {0}")]
    Selection(String),
    /// The element types are not convertible.
    #[error("cannot convert {from} to {to}")]
    Conversion {
        /// Source type.
        from: String,
        /// Destination type.
        to: String,
    },
    /// A value does not fit the destination type.
    #[error("value out of range for {0}")]
    OutOfRange(String),
    /// The transfer buffer has the wrong length.
    #[error("buffer holds {actual} bytes, but {expected} are required")]
    BufferSize {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// The element type is not supported by the backend.
    #[error("unsupported element type {0}")]
    UnsupportedType(String),
}

/// How a container is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reads only.
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

/// Kind of a named object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A node holding other objects.
    Group,
    /// An array.
    Dataset,
}

/// Dataset creation properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetCreateProps {
    /// Chunk shape in store order; `None` for contiguous storage.
    pub chunks: Option<StoreVec<u64>>,
    /// Create missing groups along the path.
    pub intermediate_groups: bool,
}

/// Handle-based primitives of a hierarchical array store.
///
/// Names are `/`-separated paths, absolute from the container root or
/// relative to the group handle they are resolved against. Extents and
/// selections are in store order.
pub trait Backend {
    /// Whether failing primitives emit diagnostics.
    fn error_reporting(&self) -> bool;
    /// Turns diagnostics of failing primitives on or off.
    fn set_error_reporting(&mut self, on: bool);
    /// Byte order of native in-memory elements.
    fn native_order(&self) -> ByteOrder;

    /// Whether `path` is a container.
    fn is_container(&mut self, path: &Path) -> Result<bool, StoreError>;
    /// Creates an empty container and opens it read-write.
    fn create_container(&mut self, path: &Path) -> Result<Hid, StoreError>;
    /// Opens an existing container.
    fn open_container(&mut self, path: &Path, mode: AccessMode) -> Result<Hid, StoreError>;

    /// Whether `name` resolves to an object. Missing intermediate groups give
    /// `false`.
    fn link_exists(&mut self, loc: Hid, name: &str) -> Result<bool, StoreError>;
    /// Opens a group or dataset.
    fn open_object(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError>;
    /// Kind of an open object.
    fn object_kind(&mut self, obj: Hid) -> Result<ObjectKind, StoreError>;
    /// Removes an object and everything below it.
    fn delete_link(&mut self, loc: Hid, name: &str) -> Result<(), StoreError>;

    /// Creates a dataset of type `dtype` and extent `space`.
    fn create_dataset(
        &mut self,
        loc: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
        props: &DatasetCreateProps,
    ) -> Result<Hid, StoreError>;
    /// Opens an existing dataset.
    fn open_dataset(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError>;
    /// A copy of the dataset's dataspace with everything selected.
    fn dataset_space(&mut self, dset: Hid) -> Result<Hid, StoreError>;
    /// The dataset's stored element type.
    fn dataset_type(&mut self, dset: Hid) -> Result<Hid, StoreError>;
    /// Grows a chunked dataset to `dims`.
    fn set_extent(&mut self, dset: Hid, dims: &StoreVec<u64>) -> Result<(), StoreError>;
    /// Reads the file selection into `buf` as elements of `mem_type`.
    ///
    /// `None` for `file_space` selects the whole dataset; `None` for
    /// `mem_space` makes `buf` a dense array of the selected elements.
    fn read_dataset(
        &mut self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &mut [u8],
    ) -> Result<(), StoreError>;
    /// Writes `buf` into the file selection. Spaces as for
    /// [`Backend::read_dataset`].
    fn write_dataset(
        &mut self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &[u8],
    ) -> Result<(), StoreError>;

    /// A rank-0 dataspace.
    fn create_scalar_space(&mut self) -> Result<Hid, StoreError>;
    /// A dataspace of extent `dims` and maximum extent `max` (`dims` if
    /// `None`).
    fn create_simple_space(
        &mut self,
        dims: &StoreVec<u64>,
        max: Option<&StoreVec<Bound>>,
    ) -> Result<Hid, StoreError>;
    /// Current and maximum extent of a dataspace.
    fn space_extent(&mut self, space: Hid)
        -> Result<(StoreVec<u64>, StoreVec<Bound>), StoreError>;
    /// Replaces the selection of a dataspace.
    fn select_hyperslab(&mut self, space: Hid, slab: &Hyperslab) -> Result<(), StoreError>;
    /// Whether the selection lies within the extent.
    fn selection_valid(&mut self, space: Hid) -> Result<bool, StoreError>;

    /// Registers an element type.
    fn create_type(&mut self, dtype: &Datatype) -> Result<Hid, StoreError>;
    /// Describes a registered element type.
    fn type_descriptor(&mut self, dtype: Hid) -> Result<Datatype, StoreError>;

    /// Whether the object has an attribute `name`.
    fn attribute_exists(&mut self, obj: Hid, name: &str) -> Result<bool, StoreError>;
    /// Creates a zero-filled attribute.
    fn create_attribute(
        &mut self,
        obj: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
    ) -> Result<Hid, StoreError>;
    /// Opens an existing attribute.
    fn open_attribute(&mut self, obj: Hid, name: &str) -> Result<Hid, StoreError>;
    /// The attribute's stored element type.
    fn attribute_type(&mut self, attr: Hid) -> Result<Hid, StoreError>;
    /// The attribute's dataspace.
    fn attribute_space(&mut self, attr: Hid) -> Result<Hid, StoreError>;
    /// Reads every element of the attribute into `buf`.
    fn read_attribute(&mut self, attr: Hid, mem_type: Hid, buf: &mut [u8])
        -> Result<(), StoreError>;
    /// Writes every element of the attribute from `buf`.
    fn write_attribute(&mut self, attr: Hid, mem_type: Hid, buf: &[u8]) -> Result<(), StoreError>;
    /// Removes an attribute.
    fn delete_attribute(&mut self, obj: Hid, name: &str) -> Result<(), StoreError>;

    /// Whether `hid` is open.
    fn is_valid(&self, hid: Hid) -> bool;
    /// Closes `hid`.
    fn close(&mut self, hid: Hid) -> Result<(), StoreError>;
}

type Store = Arc<FilesystemStore>;

/// A validated node path, as components below the root group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct NodePath(Vec<String>);

impl NodePath {
    /// Resolves `name` against `self`: absolute names start at the root.
    fn join(&self, name: &str) -> Result<Self, StoreError> {
        let mut components = if name.starts_with('/') { Vec::new() } else { self.0.clone() };
        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') || component.starts_with("__") || component == META_KEY {
                return Err(StoreError::InvalidName(name.to_string()));
            }
            components.push(component.to_string());
        }
        Ok(Self(components))
    }

    /// Every proper ancestor below the root, outermost first.
    fn ancestors(&self) -> impl Iterator<Item = NodePath> + '_ {
        (1..self.0.len()).map(|n| Self(self.0[..n].to_vec()))
    }

    fn meta_key(&self) -> Result<StoreKey, StoreError> {
        let key = match self.0.is_empty() {
            true => META_KEY.to_string(),
            false => format!("{}/{META_KEY}", self.0.join("/")),
        };
        StoreKey::new(key).map_err(|_| StoreError::InvalidName(self.to_string()))
    }

    fn prefix(&self) -> Result<StorePrefix, StoreError> {
        StorePrefix::new(format!("{}/", self.0.join("/")))
            .map_err(|_| StoreError::InvalidName(self.to_string()))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// The kind of the node at `path`, from the `node_type` of its metadata.
fn node_kind(store: &FilesystemStore, path: &NodePath) -> Result<Option<ObjectKind>, StoreError> {
    let Some(bytes) = store.get(&path.meta_key()?)? else {
        return Ok(None);
    };
    let metadata: Value = serde_json::from_slice(&bytes)
        .map_err(|err| StoreError::Metadata(format!("{path}: {err}")))?;
    match metadata.get("node_type").and_then(Value::as_str) {
        Some("group") => Ok(Some(ObjectKind::Group)),
        Some("array") => Ok(Some(ObjectKind::Dataset)),
        _ => Err(StoreError::Metadata(format!("{path}: missing or unknown node_type"))),
    }
}

fn writable(mode: AccessMode) -> Result<(), StoreError> {
    match mode {
        AccessMode::ReadWrite => Ok(()),
        AccessMode::ReadOnly => Err(StoreError::ReadOnly),
    }
}

fn to_usize(n: u64) -> Result<usize, StoreError> {
    usize::try_from(n).map_err(|_| StoreError::Layout(format!("{n} elements do not fit in memory")))
}

fn stored_type(data_type: &DataType) -> Result<Datatype, StoreError> {
    let int = |size, signed| Datatype::integer(size, signed, ByteOrder::NATIVE);
    let float = |size| Datatype::float(size, ByteOrder::NATIVE);
    Ok(match data_type {
        DataType::Int8 => int(1, true),
        DataType::Int16 => int(2, true),
        DataType::Int32 => int(4, true),
        DataType::Int64 => int(8, true),
        DataType::UInt8 => int(1, false),
        DataType::UInt16 => int(2, false),
        DataType::UInt32 => int(4, false),
        DataType::UInt64 => int(8, false),
        DataType::Float16 => float(2),
        DataType::Float32 => float(4),
        DataType::Float64 => float(8),
        DataType::Complex64 => Datatype::complex(float(4)),
        DataType::Complex128 => Datatype::complex(float(8)),
        other => return Err(StoreError::UnsupportedType(format!("{other:?}"))),
    })
}

fn zarr_type(dtype: &Datatype) -> Result<DataType, StoreError> {
    let complex = Datatype::complex(Datatype::float(8, ByteOrder::NATIVE));
    Ok(match *dtype {
        Datatype::Integer { size: 1, signed: true, .. } => DataType::Int8,
        Datatype::Integer { size: 2, signed: true, .. } => DataType::Int16,
        Datatype::Integer { size: 4, signed: true, .. } => DataType::Int32,
        Datatype::Integer { size: 8, signed: true, .. } => DataType::Int64,
        Datatype::Integer { size: 1, signed: false, .. } => DataType::UInt8,
        Datatype::Integer { size: 2, signed: false, .. } => DataType::UInt16,
        Datatype::Integer { size: 4, signed: false, .. } => DataType::UInt32,
        Datatype::Integer { size: 8, signed: false, .. } => DataType::UInt64,
        Datatype::Float { size: 2, .. } => DataType::Float16,
        Datatype::Float { size: 4, .. } => DataType::Float32,
        Datatype::Float { size: 8, .. } => DataType::Float64,
        Datatype::Compound(_) if dtype.is_compatible(&complex) && dtype.size() == 8 => {
            DataType::Complex64
        }
        Datatype::Compound(_) if dtype.is_compatible(&complex) && dtype.size() == 16 => {
            DataType::Complex128
        }
        _ => return Err(StoreError::UnsupportedType(dtype.to_string())),
    })
}

/// Runs `$body` with `$t` aliased to the element type of `$data_type`.
macro_rules! with_element {
    ($data_type:expr, |$t:ident| $body:block) => {
        match $data_type {
            DataType::Int8 => {
                type $t = i8;
                $body
            }
            DataType::Int16 => {
                type $t = i16;
                $body
            }
            DataType::Int32 => {
                type $t = i32;
                $body
            }
            DataType::Int64 => {
                type $t = i64;
                $body
            }
            DataType::UInt8 => {
                type $t = u8;
                $body
            }
            DataType::UInt16 => {
                type $t = u16;
                $body
            }
            DataType::UInt32 => {
                type $t = u32;
                $body
            }
            DataType::UInt64 => {
                type $t = u64;
                $body
            }
            DataType::Float16 => {
                type $t = half::f16;
                $body
            }
            DataType::Float32 => {
                type $t = f32;
                $body
            }
            DataType::Float64 => {
                type $t = f64;
                $body
            }
            DataType::Complex64 => {
                type $t = Complex<f32>;
                $body
            }
            DataType::Complex128 => {
                type $t = Complex<f64>;
                $body
            }
            other => Err(StoreError::UnsupportedType(format!("{other:?}"))),
        }
    };
}

/// The elements of `subset` as native bytes.
fn retrieve_region(
    array: &Array<FilesystemStore>,
    subset: &ArraySubset,
) -> Result<Vec<u8>, StoreError> {
    with_element!(array.data_type(), |T| {
        let elements = array.retrieve_array_subset_elements::<T>(subset)?;
        Ok(bytemuck::cast_slice::<T, u8>(&elements).to_vec())
    })
}

/// Stores native element `bytes` into `subset`.
fn store_region(
    array: &Array<FilesystemStore>,
    subset: &ArraySubset,
    bytes: &[u8],
) -> Result<(), StoreError> {
    with_element!(array.data_type(), |T| {
        let elements: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
        array.store_array_subset_elements::<T>(subset, &elements)?;
        Ok(())
    })
}

fn parse_maxshape(layout: &Value) -> Option<Vec<Option<u64>>> {
    layout
        .get("maxshape")?
        .as_array()?
        .iter()
        .map(|m| match m {
            Value::Null => Some(None),
            m => m.as_u64().map(Some),
        })
        .collect()
}

/// An open array with its extent as the orchestrator sees it.
struct Layout {
    array: Array<FilesystemStore>,
    dtype: Datatype,
    dims: Vec<u64>,
    maxdims: Vec<Option<u64>>,
}

impl Layout {
    fn open(store: &Store, path: &NodePath) -> Result<Self, StoreError> {
        let array = Array::open(store.clone(), &path.to_string())?;
        let dtype = stored_type(array.data_type())?;
        let shape = array.shape().to_vec();
        let (dims, maxdims) = match array.attributes().get(LAYOUT_ATTR) {
            None => (shape.clone(), shape.iter().map(|&n| Some(n)).collect()),
            Some(layout) => {
                let malformed = || StoreError::Metadata(format!("{path}: malformed {LAYOUT_ATTR}"));
                let maxdims = parse_maxshape(layout).ok_or_else(malformed)?;
                match maxdims.len() {
                    0 if shape == [1] => (Vec::new(), Vec::new()),
                    n if n == shape.len() => (shape, maxdims),
                    _ => return Err(malformed()),
                }
            }
        };
        Ok(Self { array, dtype, dims, maxdims })
    }

    fn space(&self) -> Dataspace {
        Dataspace { dims: self.dims.clone(), maxdims: self.maxdims.clone(), selection: Selection::All }
    }

    fn subset(&self, region: &[Range<u64>]) -> ArraySubset {
        match self.dims.is_empty() {
            true => ArraySubset::new_with_ranges(&[0..1]),
            false => ArraySubset::new_with_ranges(region),
        }
    }
}

/// A group or array opened for its attributes.
enum Node {
    Group(Group<FilesystemStore>),
    Array(Array<FilesystemStore>),
}

impl Node {
    fn open(object: &ObjectHandle) -> Result<Self, StoreError> {
        let path = object.path.to_string();
        Ok(match object.kind {
            ObjectKind::Group => Self::Group(Group::open(object.store.clone(), &path)?),
            ObjectKind::Dataset => Self::Array(Array::open(object.store.clone(), &path)?),
        })
    }

    fn attributes(&self) -> &Map<String, Value> {
        match self {
            Self::Group(group) => group.attributes(),
            Self::Array(array) => array.attributes(),
        }
    }

    fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            Self::Group(group) => group.attributes_mut(),
            Self::Array(array) => array.attributes_mut(),
        }
    }

    fn store_metadata(&self) -> Result<(), StoreError> {
        match self {
            Self::Group(group) => group.store_metadata()?,
            Self::Array(array) => array.store_metadata()?,
        }
        Ok(())
    }

    /// The user attribute `name`.
    fn attribute(&self, name: &str) -> Result<&Value, StoreError> {
        match self.attributes().get(name) {
            Some(value) if name != LAYOUT_ATTR => Ok(value),
            _ => Err(StoreError::NotFound(format!("attribute {name}"))),
        }
    }
}

#[derive(Debug, Clone)]
struct ObjectHandle {
    store: Store,
    path: NodePath,
    kind: ObjectKind,
    mode: AccessMode,
}

#[derive(Debug)]
enum Handle {
    Container { store: Store, mode: AccessMode },
    Object(ObjectHandle),
    Space(Dataspace),
    Type(Datatype),
    Attribute { object: ObjectHandle, name: String },
}

/// A place names are resolved against.
struct Location {
    store: Store,
    path: NodePath,
    mode: AccessMode,
}

/// Element offsets of a memory buffer, in selection order.
enum MemoryOrder {
    Dense,
    Selected(Vec<u64>),
}

impl MemoryOrder {
    fn offset(&self, i: usize) -> usize {
        match self {
            Self::Dense => i,
            Self::Selected(offsets) => offsets[i] as usize,
        }
    }
}

/// A [`Backend`] storing containers as Zarr V3 hierarchies on the local
/// filesystem.
#[derive(Debug)]
pub struct ZarrBackend {
    reporting: bool,
    next_id: u64,
    handles: HashMap<Hid, Handle>,
}

impl Default for ZarrBackend {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! reported {
    ($self:ident, $op:literal, $call:expr) => {{
        let result = $call;
        $self.report($op, result)
    }};
}

impl ZarrBackend {
    /// A backend with no open handles. Error reporting starts as
    /// [configured](crate::config::Config#error-reporting).
    pub fn new() -> Self {
        Self {
            reporting: global_config().error_reporting(),
            next_id: 1,
            handles: HashMap::new(),
        }
    }

    /// Number of open handles.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    fn report<T>(&self, op: &'static str, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(err) = &result {
            if self.reporting {
                tracing::error!(op, %err, "store primitive failed");
            }
        }
        result
    }

    fn insert(&mut self, handle: Handle) -> Hid {
        let hid = Hid(self.next_id);
        self.next_id += 1;
        tracing::trace!(%hid, ?handle, "handle opened");
        self.handles.insert(hid, handle);
        hid
    }

    fn handle(&self, hid: Hid) -> Result<&Handle, StoreError> {
        self.handles.get(&hid).ok_or(StoreError::InvalidHandle(hid))
    }

    fn location(&self, loc: Hid) -> Result<Location, StoreError> {
        match self.handle(loc)? {
            Handle::Container { store, mode } => {
                Ok(Location { store: store.clone(), path: NodePath::default(), mode: *mode })
            }
            Handle::Object(obj) if obj.kind == ObjectKind::Group => Ok(Location {
                store: obj.store.clone(),
                path: obj.path.clone(),
                mode: obj.mode,
            }),
            _ => Err(StoreError::WrongHandleKind { hid: loc, expected: "container or group" }),
        }
    }

    fn object(&self, obj: Hid) -> Result<&ObjectHandle, StoreError> {
        match self.handle(obj)? {
            Handle::Object(object) => Ok(object),
            _ => Err(StoreError::WrongHandleKind { hid: obj, expected: "group or dataset" }),
        }
    }

    fn dataset(&self, dset: Hid) -> Result<&ObjectHandle, StoreError> {
        match self.handle(dset)? {
            Handle::Object(obj) if obj.kind == ObjectKind::Dataset => Ok(obj),
            _ => Err(StoreError::WrongHandleKind { hid: dset, expected: "dataset" }),
        }
    }

    fn space(&self, space: Hid) -> Result<&Dataspace, StoreError> {
        match self.handle(space)? {
            Handle::Space(s) => Ok(s),
            _ => Err(StoreError::WrongHandleKind { hid: space, expected: "dataspace" }),
        }
    }

    fn datatype(&self, dtype: Hid) -> Result<&Datatype, StoreError> {
        match self.handle(dtype)? {
            Handle::Type(t) => Ok(t),
            _ => Err(StoreError::WrongHandleKind { hid: dtype, expected: "datatype" }),
        }
    }

    fn attribute(&self, attr: Hid) -> Result<(&ObjectHandle, &str), StoreError> {
        match self.handle(attr)? {
            Handle::Attribute { object, name } => Ok((object, name)),
            _ => Err(StoreError::WrongHandleKind { hid: attr, expected: "attribute" }),
        }
    }

    fn open_node(&mut self, location: Location, path: NodePath, kind: ObjectKind) -> Hid {
        self.insert(Handle::Object(ObjectHandle {
            store: location.store,
            path,
            kind,
            mode: location.mode,
        }))
    }

    fn try_is_container(&self, path: &Path) -> Result<bool, StoreError> {
        if !path.is_dir() {
            return Ok(false);
        }
        let store = FilesystemStore::new(path)?;
        match node_kind(&store, &NodePath::default()) {
            Ok(kind) => Ok(kind == Some(ObjectKind::Group)),
            Err(StoreError::Metadata(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn try_create_container(&mut self, path: &Path) -> Result<Hid, StoreError> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.display().to_string()));
        }
        let store = Arc::new(FilesystemStore::new(path)?);
        GroupBuilder::new().build(store.clone(), "/")?.store_metadata()?;
        Ok(self.insert(Handle::Container { store, mode: AccessMode::ReadWrite }))
    }

    fn try_open_container(&mut self, path: &Path, mode: AccessMode) -> Result<Hid, StoreError> {
        if !path.is_dir() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let store = Arc::new(FilesystemStore::new(path)?);
        match node_kind(&store, &NodePath::default())? {
            Some(ObjectKind::Group) => Ok(self.insert(Handle::Container { store, mode })),
            Some(ObjectKind::Dataset) => {
                Err(StoreError::Layout(format!("{} is an array", path.display())))
            }
            None => Err(StoreError::NotFound(path.display().to_string())),
        }
    }

    fn try_link_exists(&self, loc: Hid, name: &str) -> Result<bool, StoreError> {
        let location = self.location(loc)?;
        let target = location.path.join(name)?;
        for ancestor in target.ancestors() {
            if node_kind(&location.store, &ancestor)? != Some(ObjectKind::Group) {
                return Ok(false);
            }
        }
        Ok(node_kind(&location.store, &target)?.is_some())
    }

    fn try_open_object(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError> {
        let location = self.location(loc)?;
        let target = location.path.join(name)?;
        match node_kind(&location.store, &target)? {
            Some(kind) => Ok(self.open_node(location, target, kind)),
            None => Err(StoreError::NotFound(target.to_string())),
        }
    }

    fn try_open_dataset(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError> {
        let location = self.location(loc)?;
        let target = location.path.join(name)?;
        match node_kind(&location.store, &target)? {
            Some(ObjectKind::Dataset) => Ok(self.open_node(location, target, ObjectKind::Dataset)),
            Some(ObjectKind::Group) => Err(StoreError::NotADataset(target.to_string())),
            None => Err(StoreError::NotFound(target.to_string())),
        }
    }

    fn try_delete_link(&self, loc: Hid, name: &str) -> Result<(), StoreError> {
        let location = self.location(loc)?;
        writable(location.mode)?;
        let target = location.path.join(name)?;
        if target.0.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if node_kind(&location.store, &target)?.is_none() {
            return Err(StoreError::NotFound(target.to_string()));
        }
        location.store.erase_prefix(&target.prefix()?)?;
        Ok(())
    }

    fn try_create_dataset(
        &mut self,
        loc: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
        props: &DatasetCreateProps,
    ) -> Result<Hid, StoreError> {
        let location = self.location(loc)?;
        writable(location.mode)?;
        let dtype = self.datatype(dtype)?.clone();
        let space = self.space(space)?.clone();
        let target = location.path.join(name)?;
        if target.0.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        let data_type = zarr_type(&dtype)?;

        let rank = space.dims.len();
        // rank-0 datasets are stored with a single element
        let shape = if rank == 0 { vec![1] } else { space.dims.clone() };
        let chunk = match &props.chunks {
            None => {
                let fixed = space.maxdims.iter().zip(&space.dims).all(|(m, &d)| *m == Some(d));
                if !fixed {
                    return Err(StoreError::Layout(
                        "only chunked datasets can have a maximum extent beyond their extent"
                            .into(),
                    ));
                }
                shape.iter().map(|&n| n.max(1)).collect()
            }
            Some(chunk) => {
                let chunk = chunk.as_slice().to_vec();
                if rank == 0 || chunk.len() != rank || chunk.contains(&0) {
                    return Err(StoreError::Layout(format!(
                        "invalid chunk shape {chunk:?} for a dataset of rank {rank}"
                    )));
                }
                let too_big = chunk
                    .iter()
                    .zip(&space.maxdims)
                    .any(|(&c, m)| m.is_some_and(|m| c > m));
                if too_big {
                    return Err(StoreError::Layout(format!(
                        "chunk shape {chunk:?} exceeds the fixed maximum extent"
                    )));
                }
                chunk
            }
        };

        for ancestor in target.ancestors() {
            match node_kind(&location.store, &ancestor)? {
                Some(ObjectKind::Group) => {}
                Some(ObjectKind::Dataset) => {
                    return Err(StoreError::Layout(format!("{ancestor} is not a group")));
                }
                None if props.intermediate_groups => {
                    tracing::debug!(group = %ancestor, "creating intermediate group");
                    GroupBuilder::new()
                        .build(location.store.clone(), &ancestor.to_string())?
                        .store_metadata()?;
                }
                None => return Err(StoreError::NotFound(ancestor.to_string())),
            }
        }
        if node_kind(&location.store, &target)?.is_some() {
            return Err(StoreError::AlreadyExists(target.to_string()));
        }

        let chunk_desc = format!("{chunk:?}");
        let chunk_grid: ChunkGrid = chunk
            .try_into()
            .map_err(|_| StoreError::Layout(format!("invalid chunk shape {chunk_desc}")))?;
        let mut attributes = Map::new();
        attributes.insert(LAYOUT_ATTR.to_string(), json!({ "maxshape": space.maxdims }));
        let array = ArrayBuilder::new(
            shape,
            data_type,
            chunk_grid,
            FillValue::new(vec![0; dtype.size()]),
        )
        .attributes(attributes)
        .build(location.store.clone(), &target.to_string())?;
        array.store_metadata()?;
        Ok(self.open_node(location, target, ObjectKind::Dataset))
    }

    fn try_set_extent(&self, dset: Hid, dims: &StoreVec<u64>) -> Result<(), StoreError> {
        let obj = self.dataset(dset)?;
        writable(obj.mode)?;
        let mut layout = Layout::open(&obj.store, &obj.path)?;
        let dims = dims.as_slice();
        if dims.len() != layout.dims.len() {
            return Err(StoreError::Layout(format!(
                "extent of rank {} for a dataset of rank {}",
                dims.len(),
                layout.dims.len()
            )));
        }
        for ((&new, &old), max) in dims.iter().zip(&layout.dims).zip(&layout.maxdims) {
            if new < old {
                return Err(StoreError::Layout(format!("cannot shrink an axis from {old} to {new}")));
            }
            if let Some(max) = *max {
                if new > max {
                    return Err(StoreError::Layout(format!(
                        "extent {new} exceeds the maximum {max}"
                    )));
                }
            }
        }
        if dims == layout.dims.as_slice() {
            return Ok(());
        }
        layout.array.set_shape(dims.to_vec());
        layout.array.store_metadata()?;
        Ok(())
    }

    /// The file selection of a transfer and the memory offset of each of its
    /// elements, after checking `buf_len` against the memory extent.
    fn plan(
        &self,
        layout: &Layout,
        mem_type: &Datatype,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf_len: usize,
    ) -> Result<(Dataspace, MemoryOrder), StoreError> {
        let file = match file_space {
            Some(hid) => {
                let space = self.space(hid)?;
                if space.dims != layout.dims {
                    return Err(StoreError::Selection(format!(
                        "file dataspace extent {:?} differs from the dataset extent {:?}",
                        space.dims, layout.dims
                    )));
                }
                if !space.selection_valid() {
                    return Err(StoreError::Selection(
                        "selection lies outside the dataset extent".into(),
                    ));
                }
                space.clone()
            }
            None => layout.space(),
        };
        let selected = file.num_selected();
        let (order, points) = match mem_space {
            Some(hid) => {
                let space = self.space(hid)?;
                if space.num_selected() != selected {
                    return Err(StoreError::Selection(format!(
                        "memory selection has {} elements, file selection {selected}",
                        space.num_selected()
                    )));
                }
                let order = match space.selection {
                    Selection::All => MemoryOrder::Dense,
                    Selection::Slab(_) => MemoryOrder::Selected(space.selected_offsets()),
                };
                (order, space.num_points())
            }
            None => (MemoryOrder::Dense, selected),
        };
        let expected = to_usize(points)? * mem_type.size();
        if buf_len != expected {
            return Err(StoreError::BufferSize { expected, actual: buf_len });
        }
        Ok((file, order))
    }

    fn try_read_dataset(
        &self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &mut [u8],
    ) -> Result<(), StoreError> {
        let obj = self.dataset(dset)?;
        let layout = Layout::open(&obj.store, &obj.path)?;
        let mem_type = self.datatype(mem_type)?;
        if !convertible(&layout.dtype, mem_type) {
            return Err(StoreError::Conversion {
                from: layout.dtype.to_string(),
                to: mem_type.to_string(),
            });
        }
        let (file, order) = self.plan(&layout, mem_type, mem_space, file_space, buf.len())?;
        if file.num_selected() == 0 {
            return Ok(());
        }
        let region = file.bounding_box();
        let raw = retrieve_region(&layout.array, &layout.subset(&region))?;
        let (file_size, mem_size) = (layout.dtype.size(), mem_type.size());
        let mut result = Ok(());
        let mut i = 0;
        file.for_each_in_box(&region, |at| {
            if result.is_err() {
                return;
            }
            let (at, m) = (at as usize, order.offset(i));
            i += 1;
            result = convert_element(
                &layout.dtype,
                mem_type,
                &raw[at * file_size..(at + 1) * file_size],
                &mut buf[m * mem_size..(m + 1) * mem_size],
            );
        });
        result
    }

    fn try_write_dataset(
        &self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &[u8],
    ) -> Result<(), StoreError> {
        let obj = self.dataset(dset)?;
        writable(obj.mode)?;
        let layout = Layout::open(&obj.store, &obj.path)?;
        let mem_type = self.datatype(mem_type)?;
        if !convertible(mem_type, &layout.dtype) {
            return Err(StoreError::Conversion {
                from: mem_type.to_string(),
                to: layout.dtype.to_string(),
            });
        }
        let (file, order) = self.plan(&layout, mem_type, mem_space, file_space, buf.len())?;
        if file.num_selected() == 0 {
            return Ok(());
        }
        let region = file.bounding_box();
        let subset = layout.subset(&region);
        let (file_size, mem_size) = (layout.dtype.size(), mem_type.size());
        // elements between strided blocks keep their stored values
        let mut raw = match file.is_dense() {
            true => {
                let len: u64 = region.iter().map(|r| r.end - r.start).product();
                vec![0; to_usize(len.max(1))? * file_size]
            }
            false => retrieve_region(&layout.array, &subset)?,
        };
        let mut result = Ok(());
        let mut i = 0;
        file.for_each_in_box(&region, |at| {
            if result.is_err() {
                return;
            }
            let (at, m) = (at as usize, order.offset(i));
            i += 1;
            result = convert_element(
                mem_type,
                &layout.dtype,
                &buf[m * mem_size..(m + 1) * mem_size],
                &mut raw[at * file_size..(at + 1) * file_size],
            );
        });
        result?;
        store_region(&layout.array, &subset, &raw)
    }

    fn try_space_extent(
        &self,
        space: Hid,
    ) -> Result<(StoreVec<u64>, StoreVec<Bound>), StoreError> {
        let space = self.space(space)?;
        Ok((StoreVec::new(space.dims.clone()), StoreVec::new(space.max_bounds())))
    }

    fn try_select_hyperslab(&mut self, space: Hid, slab: &Hyperslab) -> Result<(), StoreError> {
        match self.handles.get_mut(&space) {
            Some(Handle::Space(s)) => s.select_hyperslab(slab).map_err(StoreError::Selection),
            Some(_) => Err(StoreError::WrongHandleKind { hid: space, expected: "dataspace" }),
            None => Err(StoreError::InvalidHandle(space)),
        }
    }

    fn try_attribute_exists(&self, obj: Hid, name: &str) -> Result<bool, StoreError> {
        let node = Node::open(self.object(obj)?)?;
        Ok(node.attribute(name).is_ok())
    }

    fn try_create_attribute(
        &mut self,
        obj: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
    ) -> Result<Hid, StoreError> {
        let object = self.object(obj)?.clone();
        writable(object.mode)?;
        if name.is_empty() || name == LAYOUT_ATTR {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        let dtype = self.datatype(dtype)?;
        let dims = self.space(space)?.dims.clone();
        let zeros = vec![0; to_usize(dims.iter().product())? * dtype.size()];
        let value = to_json(dtype, &dims, &zeros)?;
        let mut node = Node::open(&object)?;
        if node.attributes().contains_key(name) {
            return Err(StoreError::AlreadyExists(format!("attribute {name}")));
        }
        node.attributes_mut().insert(name.to_string(), value);
        node.store_metadata()?;
        Ok(self.insert(Handle::Attribute { object, name: name.to_string() }))
    }

    fn try_open_attribute(&mut self, obj: Hid, name: &str) -> Result<Hid, StoreError> {
        let object = self.object(obj)?.clone();
        Node::open(&object)?.attribute(name)?;
        Ok(self.insert(Handle::Attribute { object, name: name.to_string() }))
    }

    fn stored_attribute(&self, attr: Hid) -> Result<attrs::AttrData, StoreError> {
        let (object, name) = self.attribute(attr)?;
        from_json(Node::open(object)?.attribute(name)?)
    }

    fn try_attribute_type(&mut self, attr: Hid) -> Result<Hid, StoreError> {
        let stored = self.stored_attribute(attr)?;
        Ok(self.insert(Handle::Type(stored.dtype)))
    }

    fn try_attribute_space(&mut self, attr: Hid) -> Result<Hid, StoreError> {
        let stored = self.stored_attribute(attr)?;
        let space = match stored.dims.is_empty() {
            true => Dataspace::scalar(),
            false => Dataspace::simple(&stored.dims, None),
        };
        Ok(self.insert(Handle::Space(space)))
    }

    fn try_read_attribute(&self, attr: Hid, mem_type: Hid, buf: &mut [u8]) -> Result<(), StoreError> {
        let stored = self.stored_attribute(attr)?;
        let mem_type = self.datatype(mem_type)?;
        if !convertible(&stored.dtype, mem_type) {
            return Err(StoreError::Conversion {
                from: stored.dtype.to_string(),
                to: mem_type.to_string(),
            });
        }
        let (file_size, mem_size) = (stored.dtype.size(), mem_type.size());
        let n = to_usize(stored.dims.iter().product())?;
        if buf.len() != n * mem_size {
            return Err(StoreError::BufferSize { expected: n * mem_size, actual: buf.len() });
        }
        for i in 0..n {
            convert_element(
                &stored.dtype,
                mem_type,
                &stored.bytes[i * file_size..(i + 1) * file_size],
                &mut buf[i * mem_size..(i + 1) * mem_size],
            )?;
        }
        Ok(())
    }

    fn try_write_attribute(&self, attr: Hid, mem_type: Hid, buf: &[u8]) -> Result<(), StoreError> {
        let (object, name) = self.attribute(attr)?;
        writable(object.mode)?;
        let stored = self.stored_attribute(attr)?;
        let mem_type = self.datatype(mem_type)?;
        if !convertible(mem_type, &stored.dtype) {
            return Err(StoreError::Conversion {
                from: mem_type.to_string(),
                to: stored.dtype.to_string(),
            });
        }
        let (file_size, mem_size) = (stored.dtype.size(), mem_type.size());
        let n = to_usize(stored.dims.iter().product())?;
        if buf.len() != n * mem_size {
            return Err(StoreError::BufferSize { expected: n * mem_size, actual: buf.len() });
        }
        // text is stored at its written length rather than the created one
        let (dtype, size) = match (&stored.dtype, mem_type) {
            (Datatype::FixedString { .. }, &Datatype::FixedString { size }) if n == 1 => {
                (Datatype::FixedString { size }, size)
            }
            _ => (stored.dtype.clone(), file_size),
        };
        let mut data = vec![0; n * size];
        for i in 0..n {
            convert_element(
                mem_type,
                &dtype,
                &buf[i * mem_size..(i + 1) * mem_size],
                &mut data[i * size..(i + 1) * size],
            )?;
        }
        let value = to_json(&dtype, &stored.dims, &data)?;
        let mut node = Node::open(object)?;
        node.attributes_mut().insert(name.to_string(), value);
        node.store_metadata()
    }

    fn try_delete_attribute(&self, obj: Hid, name: &str) -> Result<(), StoreError> {
        let object = self.object(obj)?;
        writable(object.mode)?;
        let mut node = Node::open(object)?;
        node.attribute(name)?;
        node.attributes_mut().remove(name);
        node.store_metadata()
    }
}

impl Backend for ZarrBackend {
    fn error_reporting(&self) -> bool {
        self.reporting
    }

    fn set_error_reporting(&mut self, on: bool) {
        self.reporting = on;
    }

    fn native_order(&self) -> ByteOrder {
        ByteOrder::NATIVE
    }

    fn is_container(&mut self, path: &Path) -> Result<bool, StoreError> {
        let result = reported!(self, "is_container", self.try_is_container(path));
        if let Ok(false) = result {
            if self.reporting {
                tracing::error!(path = %path.display(), "not a container");
            }
        }
        result
    }

    fn create_container(&mut self, path: &Path) -> Result<Hid, StoreError> {
        reported!(self, "create_container", self.try_create_container(path))
    }

    fn open_container(&mut self, path: &Path, mode: AccessMode) -> Result<Hid, StoreError> {
        reported!(self, "open_container", self.try_open_container(path, mode))
    }

    fn link_exists(&mut self, loc: Hid, name: &str) -> Result<bool, StoreError> {
        reported!(self, "link_exists", self.try_link_exists(loc, name))
    }

    fn open_object(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError> {
        reported!(self, "open_object", self.try_open_object(loc, name))
    }

    fn object_kind(&mut self, obj: Hid) -> Result<ObjectKind, StoreError> {
        reported!(self, "object_kind", self.object(obj).map(|o| o.kind))
    }

    fn delete_link(&mut self, loc: Hid, name: &str) -> Result<(), StoreError> {
        reported!(self, "delete_link", self.try_delete_link(loc, name))
    }

    fn create_dataset(
        &mut self,
        loc: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
        props: &DatasetCreateProps,
    ) -> Result<Hid, StoreError> {
        reported!(self, "create_dataset", self.try_create_dataset(loc, name, dtype, space, props))
    }

    fn open_dataset(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError> {
        reported!(self, "open_dataset", self.try_open_dataset(loc, name))
    }

    fn dataset_space(&mut self, dset: Hid) -> Result<Hid, StoreError> {
        let result = self
            .dataset(dset)
            .and_then(|obj| Layout::open(&obj.store, &obj.path))
            .map(|layout| layout.space());
        reported!(self, "dataset_space", result.map(|space| self.insert(Handle::Space(space))))
    }

    fn dataset_type(&mut self, dset: Hid) -> Result<Hid, StoreError> {
        let result = self.dataset(dset).and_then(|obj| Layout::open(&obj.store, &obj.path));
        reported!(
            self,
            "dataset_type",
            result.map(|layout| self.insert(Handle::Type(layout.dtype)))
        )
    }

    fn set_extent(&mut self, dset: Hid, dims: &StoreVec<u64>) -> Result<(), StoreError> {
        reported!(self, "set_extent", self.try_set_extent(dset, dims))
    }

    fn read_dataset(
        &mut self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &mut [u8],
    ) -> Result<(), StoreError> {
        reported!(
            self,
            "read_dataset",
            self.try_read_dataset(dset, mem_type, mem_space, file_space, buf)
        )
    }

    fn write_dataset(
        &mut self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &[u8],
    ) -> Result<(), StoreError> {
        reported!(
            self,
            "write_dataset",
            self.try_write_dataset(dset, mem_type, mem_space, file_space, buf)
        )
    }

    fn create_scalar_space(&mut self) -> Result<Hid, StoreError> {
        Ok(self.insert(Handle::Space(Dataspace::scalar())))
    }

    fn create_simple_space(
        &mut self,
        dims: &StoreVec<u64>,
        max: Option<&StoreVec<Bound>>,
    ) -> Result<Hid, StoreError> {
        let result = match max {
            Some(max) if max.len() != dims.len() => Err(StoreError::Layout(format!(
                "maximum extent of rank {} for an extent of rank {}",
                max.len(),
                dims.len()
            ))),
            Some(max)
                if dims
                    .iter()
                    .zip(max.iter())
                    .any(|(&d, m)| m.finite().is_some_and(|m| d > m)) =>
            {
                Err(StoreError::Layout("extent exceeds the maximum extent".into()))
            }
            _ => Ok(Dataspace::simple(dims.as_slice(), max.map(|m| m.as_slice()))),
        };
        reported!(
            self,
            "create_simple_space",
            result.map(|space| self.insert(Handle::Space(space)))
        )
    }

    fn space_extent(
        &mut self,
        space: Hid,
    ) -> Result<(StoreVec<u64>, StoreVec<Bound>), StoreError> {
        reported!(self, "space_extent", self.try_space_extent(space))
    }

    fn select_hyperslab(&mut self, space: Hid, slab: &Hyperslab) -> Result<(), StoreError> {
        reported!(self, "select_hyperslab", self.try_select_hyperslab(space, slab))
    }

    fn selection_valid(&mut self, space: Hid) -> Result<bool, StoreError> {
        reported!(self, "selection_valid", self.space(space).map(|s| s.selection_valid()))
    }

    fn create_type(&mut self, dtype: &Datatype) -> Result<Hid, StoreError> {
        Ok(self.insert(Handle::Type(dtype.clone())))
    }

    fn type_descriptor(&mut self, dtype: Hid) -> Result<Datatype, StoreError> {
        reported!(self, "type_descriptor", self.datatype(dtype).cloned())
    }

    fn attribute_exists(&mut self, obj: Hid, name: &str) -> Result<bool, StoreError> {
        reported!(self, "attribute_exists", self.try_attribute_exists(obj, name))
    }

    fn create_attribute(
        &mut self,
        obj: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
    ) -> Result<Hid, StoreError> {
        reported!(self, "create_attribute", self.try_create_attribute(obj, name, dtype, space))
    }

    fn open_attribute(&mut self, obj: Hid, name: &str) -> Result<Hid, StoreError> {
        reported!(self, "open_attribute", self.try_open_attribute(obj, name))
    }

    fn attribute_type(&mut self, attr: Hid) -> Result<Hid, StoreError> {
        reported!(self, "attribute_type", self.try_attribute_type(attr))
    }

    fn attribute_space(&mut self, attr: Hid) -> Result<Hid, StoreError> {
        reported!(self, "attribute_space", self.try_attribute_space(attr))
    }

    fn read_attribute(&mut self, attr: Hid, mem_type: Hid, buf: &mut [u8]) -> Result<(), StoreError> {
        reported!(self, "read_attribute", self.try_read_attribute(attr, mem_type, buf))
    }

    fn write_attribute(&mut self, attr: Hid, mem_type: Hid, buf: &[u8]) -> Result<(), StoreError> {
        reported!(self, "write_attribute", self.try_write_attribute(attr, mem_type, buf))
    }

    fn delete_attribute(&mut self, obj: Hid, name: &str) -> Result<(), StoreError> {
        reported!(self, "delete_attribute", self.try_delete_attribute(obj, name))
    }

    fn is_valid(&self, hid: Hid) -> bool {
        self.handles.contains_key(&hid)
    }

    fn close(&mut self, hid: Hid) -> Result<(), StoreError> {
        let result = match self.handles.remove(&hid) {
            Some(_) => {
                tracing::trace!(%hid, "handle closed");
                Ok(())
            }
            None => Err(StoreError::InvalidHandle(hid)),
        };
        reported!(self, "close", result)
    }
}
