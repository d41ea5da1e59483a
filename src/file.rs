//! Dataset and attribute operations on a container.
//!
//! Each operation opens the container, resolves the object, resolves the
//! selection and the element type, transfers the data and releases every
//! handle it opened, in that order. Any failure skips straight to the
//! release.
//!
//! ```
//! use hslab::{read_dataset, write_dataset, HostArray};
//! use ndarray::{arr2, ArrayD};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("example.hslab");
//! let a: ArrayD<f64> = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
//! write_dataset(&path, "/g/a", &HostArray::from(a.clone()))?;
//! assert_eq!(read_dataset(&path, "/g/a")?.into_array::<f64>(), Some(a));
//! # Ok(())
//! # }
//! ```
use crate::{
    chunk::suggest_chunk_shape,
    config::global_config,
    dtype::{classify_on_disk_type, ByteOrder, Datatype, HostKind, TypeMapping},
    error::{ContainerError, Error, ObjectError, Result, ShapeError, TransferError, TypeError},
    handles::HandleScope,
    order::{HostVec, StoreVec},
    selection::{resolve, Access, Bound, SlabRequest},
    store::{AccessMode, Backend, DatasetCreateProps, ZarrBackend, Hid, StoreError},
    value::{AttrValue, HostArray},
};
use std::path::Path;

/// How chunked storage is chosen for a new dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChunkSpec {
    /// Contiguous storage. Every axis must be fixed.
    #[default]
    None,
    /// A shape chosen by [`suggest_chunk_shape`].
    Auto,
    /// An explicit chunk shape in host order.
    Explicit(Vec<u64>),
}

/// Options of [`DatasetIo::create_dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// Element type of the new dataset.
    pub datatype: HostKind,
    /// Storage layout of the new dataset.
    pub chunks: ChunkSpec,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self { datatype: HostKind::Real64, chunks: ChunkSpec::None }
    }
}

impl CreateOptions {
    /// Sets the element type.
    #[must_use]
    pub fn with_datatype(mut self, datatype: HostKind) -> Self {
        self.datatype = datatype;
        self
    }

    /// Sets the chunking.
    #[must_use]
    pub fn with_chunks(mut self, chunks: ChunkSpec) -> Self {
        self.chunks = chunks;
        self
    }
}

/// Largest chunk, in bytes, a dataset may be created with.
pub const MAX_CHUNK_BYTES: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenPolicy {
    Read,
    Write,
    Create,
}

/// Runs dataset operations against a [`Backend`].
#[derive(Debug, Default)]
pub struct DatasetIo<B: Backend = ZarrBackend> {
    backend: B,
}

impl DatasetIo {
    /// Operations on directory containers.
    pub fn new() -> Self {
        Self::default()
    }
}

fn object_open(name: &str) -> impl FnOnce(StoreError) -> Error + '_ {
    move |source| ObjectError::Open { name: name.to_string(), source }.into()
}

fn read_failed(name: &str) -> impl FnOnce(StoreError) -> Error + '_ {
    move |source| TransferError::Read { name: name.to_string(), source }.into()
}

fn write_failed(name: &str) -> impl FnOnce(StoreError) -> Error + '_ {
    move |source| TransferError::Write { name: name.to_string(), source }.into()
}

fn to_u64(dims: &StoreVec<usize>) -> StoreVec<u64> {
    dims.map(|&n| n as u64)
}

fn to_usize(dims: &StoreVec<u64>) -> StoreVec<usize> {
    dims.map(|&n| n as usize)
}

fn is_complex(dtype: &Datatype) -> bool {
    dtype.is_compatible(&Datatype::complex(Datatype::float(8, ByteOrder::NATIVE)))
}

fn open_container<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    path: &Path,
    policy: OpenPolicy,
) -> Result<Hid> {
    tracing::debug!(path = %path.display(), ?policy, "opening container");
    let open_failed = |source: StoreError| ContainerError::Open { path: path.to_path_buf(), source };
    if path.exists() {
        let valid = scope.quiet().is_container(path).map_err(open_failed)?;
        if !valid {
            return Err(ContainerError::NotAContainer(path.to_path_buf()).into());
        }
        let mode = match policy {
            OpenPolicy::Read => AccessMode::ReadOnly,
            OpenPolicy::Write | OpenPolicy::Create => AccessMode::ReadWrite,
        };
        Ok(scope.acquire(|b| b.open_container(path, mode)).map_err(open_failed)?)
    } else if policy == OpenPolicy::Create {
        let hid = scope
            .acquire(|b| b.create_container(path))
            .map_err(|source| ContainerError::Create { path: path.to_path_buf(), source })?;
        Ok(hid)
    } else {
        Err(ContainerError::Missing(path.to_path_buf()).into())
    }
}

fn exists<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    file: Hid,
    name: &str,
) -> Result<bool> {
    scope.backend().link_exists(file, name).map_err(object_open(name))
}

fn open_object<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    file: Hid,
    name: &str,
) -> Result<Hid> {
    tracing::debug!(name, "resolving object");
    if !exists(scope, file, name)? {
        return Err(ObjectError::NotFound(name.to_string()).into());
    }
    scope.acquire(|b| b.open_object(file, name)).map_err(object_open(name))
}

fn open_dataset<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    file: Hid,
    name: &str,
) -> Result<Hid> {
    tracing::debug!(name, "resolving dataset");
    if !exists(scope, file, name)? {
        return Err(ObjectError::NotFound(name.to_string()).into());
    }
    scope.acquire(|b| b.open_dataset(file, name)).map_err(|source| match source {
        StoreError::NotADataset(_) => {
            ObjectError::Incompatible { name: name.to_string(), reason: "it is a group".into() }
                .into()
        }
        source => object_open(name)(source),
    })
}

/// The stored element type of a dataset.
fn stored_type<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    dset: Hid,
) -> Result<Datatype> {
    let stored = scope.acquire(|b| b.dataset_type(dset)).map_err(TypeError::Store)?;
    Ok(scope.backend().type_descriptor(stored).map_err(TypeError::Store)?)
}

/// Classifies the stored type of `dset` and registers the matching memory
/// type.
fn read_type<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    dset: Hid,
) -> Result<(TypeMapping, Hid)> {
    let descriptor = stored_type(scope, dset)?;
    let kind = classify_on_disk_type(&descriptor)?;
    tracing::debug!(%descriptor, %kind, "resolved stored type");
    if kind == HostKind::String {
        return Err(TypeError::UnsupportedKind { kind, context: "dataset reads" }.into());
    }
    let mapping = TypeMapping::for_kind(kind, scope.backend().native_order())?;
    let mem = scope.acquire(|b| b.create_type(&mapping.in_memory)).map_err(TypeError::Store)?;
    Ok((mapping, mem))
}

/// Registers the memory type for writing `data` into a dataset stored as
/// `stored`.
fn write_type<B: Backend + ?Sized>(
    scope: &mut HandleScope<'_, B>,
    name: &str,
    stored: &Datatype,
    data: &HostArray,
) -> Result<Hid> {
    let kind = data.kind();
    if is_complex(stored) != (kind == HostKind::Complex) {
        return Err(TypeError::Mismatch { name: name.to_string(), stored: stored.to_string(), kind }
            .into());
    }
    let mapping = TypeMapping::for_kind(kind, scope.backend().native_order())?;
    Ok(scope.acquire(|b| b.create_type(&mapping.in_memory)).map_err(TypeError::Store)?)
}

impl<B: Backend> DatasetIo<B> {
    /// Operations on `backend`.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Unwraps the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Reads a whole dataset.
    pub fn read_dataset<P: AsRef<Path>>(&mut self, path: P, name: &str) -> Result<HostArray> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("read_dataset", path = %path.display(), name).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Read)?;
        let dset = open_dataset(&mut scope, file, name)?;
        let space = scope.acquire(|b| b.dataset_space(dset)).map_err(object_open(name))?;
        let (dims, _) = scope.backend().space_extent(space).map_err(object_open(name))?;
        let (mapping, mem_type) = read_type(&mut scope, dset)?;

        tracing::debug!(?dims, "transferring");
        let n: u64 = dims.iter().product();
        let mut buf = vec![0; n as usize * mapping.size];
        scope
            .backend()
            .read_dataset(dset, mem_type, None, None, &mut buf)
            .map_err(read_failed(name))?;
        let dims = to_usize(&dims);
        let shape = dims.clone().reorder().into_vec();
        HostArray::from_native_bytes(mapping.kind, dims, &buf)
            .ok_or_else(|| TransferError::Layout { name: name.to_string(), shape }.into())
    }

    /// Reads a hyperslab of a dataset.
    ///
    /// The result has shape `count * block` per axis.
    pub fn read_dataset_slab<P: AsRef<Path>>(
        &mut self,
        path: P,
        name: &str,
        request: &SlabRequest,
    ) -> Result<HostArray> {
        let path = path.as_ref();
        let _span =
            tracing::debug_span!("read_dataset_slab", path = %path.display(), name).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Read)?;
        let dset = open_dataset(&mut scope, file, name)?;
        let space = scope.acquire(|b| b.dataset_space(dset)).map_err(object_open(name))?;
        let (current, max) = scope.backend().space_extent(space).map_err(object_open(name))?;

        tracing::debug!(?request, ?current, "resolving selection");
        let resolved = resolve(request, &current, &max, Access::Read)?;
        scope.backend().select_hyperslab(space, &resolved.slab).map_err(ShapeError::Select)?;
        let mem_dims = resolved.result_shape.clone().reorder();
        let mem_space = scope
            .acquire(|b| b.create_simple_space(&to_u64(&mem_dims), None))
            .map_err(ShapeError::Select)?;
        let (mapping, mem_type) = read_type(&mut scope, dset)?;

        tracing::debug!(slab = ?resolved.slab, "transferring");
        let n: usize = mem_dims.iter().product();
        let mut buf = vec![0; n * mapping.size];
        scope
            .backend()
            .read_dataset(dset, mem_type, Some(mem_space), Some(space), &mut buf)
            .map_err(read_failed(name))?;
        let shape = resolved.result_shape.into_vec();
        HostArray::from_native_bytes(mapping.kind, mem_dims, &buf)
            .ok_or_else(|| TransferError::Layout { name: name.to_string(), shape }.into())
    }

    /// Writes `data` as the whole dataset, creating the container and the
    /// dataset if needed.
    ///
    /// An existing dataset is kept and overwritten; its extent must equal
    /// the shape of `data`.
    pub fn write_dataset<P: AsRef<Path>>(
        &mut self,
        path: P,
        name: &str,
        data: &HostArray,
    ) -> Result<()> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("write_dataset", path = %path.display(), name).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Create)?;
        let (bytes, dims) = data.to_store_bytes();
        let dims = to_u64(&dims);

        let dset = if exists(&mut scope, file, name)? {
            let dset = open_dataset(&mut scope, file, name)?;
            let space = scope.acquire(|b| b.dataset_space(dset)).map_err(object_open(name))?;
            let (current, _) = scope.backend().space_extent(space).map_err(object_open(name))?;
            if current != dims {
                return Err(ObjectError::Incompatible {
                    name: name.to_string(),
                    reason: format!(
                        "its extent {:?} differs from the data shape {:?}",
                        current.reorder(),
                        data.shape()
                    ),
                }
                .into());
            }
            tracing::debug!(name, "overwriting existing dataset");
            dset
        } else {
            let mapping = TypeMapping::for_kind(data.kind(), scope.backend().native_order())?;
            let space = scope
                .acquire(|b| {
                    if dims.is_empty() {
                        b.create_scalar_space()
                    } else {
                        b.create_simple_space(&dims, None)
                    }
                })
                .map_err(object_open(name))?;
            let dtype = scope.acquire(|b| b.create_type(&mapping.on_disk)).map_err(TypeError::Store)?;
            let props = DatasetCreateProps {
                chunks: None,
                intermediate_groups: global_config().create_intermediate_groups(),
            };
            tracing::debug!(name, ?dims, "creating dataset");
            scope
                .acquire(|b| b.create_dataset(file, name, dtype, space, &props))
                .map_err(|source| ObjectError::Create { name: name.to_string(), source })?
        };

        let stored = stored_type(&mut scope, dset)?;
        let mem_type = write_type(&mut scope, name, &stored, data)?;
        tracing::debug!(bytes = bytes.len(), "transferring");
        scope
            .backend()
            .write_dataset(dset, mem_type, None, None, &bytes)
            .map_err(write_failed(name))
    }

    /// Writes `data` into a hyperslab of an existing dataset, growing the
    /// dataset up to its maximum extent if the selection reaches past it.
    ///
    /// Counts must be concrete, and `data` must hold exactly the selected
    /// number of elements. Its elements fill the selection in column-major
    /// order of the host shape.
    pub fn write_dataset_slab<P: AsRef<Path>>(
        &mut self,
        path: P,
        name: &str,
        data: &HostArray,
        request: &SlabRequest,
    ) -> Result<()> {
        let path = path.as_ref();
        let _span =
            tracing::debug_span!("write_dataset_slab", path = %path.display(), name).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Write)?;
        let dset = open_dataset(&mut scope, file, name)?;
        let mut space = scope.acquire(|b| b.dataset_space(dset)).map_err(object_open(name))?;
        let (current, max) = scope.backend().space_extent(space).map_err(object_open(name))?;

        tracing::debug!(?request, ?current, "resolving selection");
        let resolved = resolve(request, &current, &max, Access::Write)?;
        let selected = resolved.result_shape.iter().product::<usize>();
        if data.len() != selected {
            return Err(ShapeError::DataMismatch { data: data.len(), selected: selected as u64 }
                .into());
        }
        let stored = stored_type(&mut scope, dset)?;
        let mem_type = write_type(&mut scope, name, &stored, data)?;
        if let Some(grow_to) = &resolved.grow_to {
            tracing::debug!(?grow_to, "growing dataset");
            scope.release(space).map_err(ShapeError::Resize)?;
            scope.backend().set_extent(dset, grow_to).map_err(ShapeError::Resize)?;
            space = scope.acquire(|b| b.dataset_space(dset)).map_err(ShapeError::Resize)?;
        }
        scope.backend().select_hyperslab(space, &resolved.slab).map_err(ShapeError::Select)?;
        if !scope.backend().selection_valid(space).map_err(ShapeError::Select)? {
            let reason = "the hyperslab lies outside the dataset extent".to_string();
            return Err(ShapeError::Select(StoreError::Selection(reason)).into());
        }
        let mem_dims = to_u64(&resolved.result_shape.clone().reorder());
        let mem_space = scope
            .acquire(|b| b.create_simple_space(&mem_dims, None))
            .map_err(ShapeError::Select)?;
        let (bytes, _) = data.to_store_bytes();
        tracing::debug!(slab = ?resolved.slab, "transferring");
        scope
            .backend()
            .write_dataset(dset, mem_type, Some(mem_space), Some(space), &bytes)
            .map_err(write_failed(name))
    }

    /// Creates an empty dataset of extent `shape` (host order), creating the
    /// container if needed.
    ///
    /// Zero and infinite entries of `shape` declare unlimited axes starting
    /// at length zero, which require chunked storage. An existing dataset of
    /// the same name is left as it is.
    pub fn create_dataset<P: AsRef<Path>>(
        &mut self,
        path: P,
        name: &str,
        shape: &[Bound],
        options: &CreateOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("create_dataset", path = %path.display(), name).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Create)?;
        let mapping = TypeMapping::for_kind(options.datatype, scope.backend().native_order())?;
        let rank = shape.len();
        let chunks = match &options.chunks {
            ChunkSpec::None if shape.iter().any(|b| b.is_fill()) => {
                return Err(ShapeError::UnlimitedWithoutChunks.into());
            }
            ChunkSpec::None => None,
            ChunkSpec::Auto => Some(suggest_chunk_shape(&HostVec::new(shape.to_vec()), mapping.size)),
            ChunkSpec::Explicit(chunks) => {
                if chunks.len() != rank {
                    let len = chunks.len();
                    return Err(ShapeError::WrongLength { name: "chunksize", rank, len }.into());
                }
                if chunks.contains(&0) {
                    return Err(ShapeError::NotPositive("chunksize").into());
                }
                let bytes = chunks
                    .iter()
                    .try_fold(mapping.size as u64, |bytes, &n| bytes.checked_mul(n))
                    .filter(|&bytes| bytes <= MAX_CHUNK_BYTES);
                if bytes.is_none() {
                    return Err(ShapeError::ChunkTooLarge { limit: MAX_CHUNK_BYTES }.into());
                }
                Some(HostVec::new(chunks.clone()))
            }
        };

        if exists(&mut scope, file, name)? {
            open_dataset(&mut scope, file, name)?;
            tracing::debug!(name, "dataset exists; keeping it");
            return Ok(());
        }

        let current = HostVec::new(shape.iter().map(|b| b.finite().unwrap_or(0)).collect());
        let max = HostVec::new(
            shape.iter().map(|&b| if b.is_fill() { Bound::Infinite } else { b }).collect(),
        );
        let space = scope
            .acquire(|b| {
                if rank == 0 {
                    b.create_scalar_space()
                } else {
                    b.create_simple_space(&current.reorder(), Some(&max.reorder()))
                }
            })
            .map_err(|source| ObjectError::Create { name: name.to_string(), source })?;
        let dtype = scope.acquire(|b| b.create_type(&mapping.on_disk)).map_err(TypeError::Store)?;
        let props = DatasetCreateProps {
            chunks: chunks.filter(|c| !c.is_empty()).map(HostVec::reorder),
            intermediate_groups: global_config().create_intermediate_groups(),
        };
        tracing::debug!(name, ?props, "creating dataset");
        scope
            .acquire(|b| b.create_dataset(file, name, dtype, space, &props))
            .map_err(|source| ObjectError::Create { name: name.to_string(), source })?;
        Ok(())
    }

    /// Reads attribute `attr` of object `object`.
    ///
    /// Text attributes come back without trailing NULs. Complex attributes
    /// are rejected.
    pub fn read_attribute<P: AsRef<Path>>(
        &mut self,
        path: P,
        object: &str,
        attr: &str,
    ) -> Result<AttrValue> {
        let path = path.as_ref();
        let _span =
            tracing::debug_span!("read_attribute", path = %path.display(), object, attr).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Read)?;
        let obj = open_object(&mut scope, file, object)?;
        if !scope.backend().attribute_exists(obj, attr).map_err(object_open(object))? {
            return Err(ObjectError::AttributeNotFound {
                object: object.to_string(),
                attr: attr.to_string(),
            }
            .into());
        }
        let handle = scope.acquire(|b| b.open_attribute(obj, attr)).map_err(object_open(attr))?;
        let space = scope.acquire(|b| b.attribute_space(handle)).map_err(object_open(attr))?;
        let (dims, _) = scope.backend().space_extent(space).map_err(object_open(attr))?;
        let stored = scope.acquire(|b| b.attribute_type(handle)).map_err(TypeError::Store)?;
        let descriptor = scope.backend().type_descriptor(stored).map_err(TypeError::Store)?;
        let kind = classify_on_disk_type(&descriptor)?;
        let mapping = match kind {
            HostKind::Complex => return Err(TypeError::ComplexAttribute.into()),
            HostKind::String => TypeMapping::for_string(descriptor.size()),
            kind => TypeMapping::for_kind(kind, scope.backend().native_order())?,
        };
        let mem_type = scope.acquire(|b| b.create_type(&mapping.in_memory)).map_err(TypeError::Store)?;

        let n: u64 = dims.iter().product();
        let mut buf = vec![0; n as usize * mapping.size];
        scope.backend().read_attribute(handle, mem_type, &mut buf).map_err(read_failed(attr))?;
        if kind == HostKind::String {
            let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            return Ok(AttrValue::Text(String::from_utf8_lossy(&buf[..end]).into_owned()));
        }
        let dims = to_usize(&dims);
        let shape = dims.clone().reorder().into_vec();
        HostArray::from_native_bytes(kind, dims, &buf)
            .map(AttrValue::Numeric)
            .ok_or_else(|| TransferError::Layout { name: attr.to_string(), shape }.into())
    }

    /// Writes attribute `attr` of object `object`, replacing any previous
    /// value.
    ///
    /// Only scalar numbers and text are accepted.
    pub fn write_attribute<P: AsRef<Path>>(
        &mut self,
        path: P,
        object: &str,
        attr: &str,
        value: &AttrValue,
    ) -> Result<()> {
        let path = path.as_ref();
        let _span =
            tracing::debug_span!("write_attribute", path = %path.display(), object, attr).entered();
        let (mapping, bytes) = match value {
            AttrValue::Text(text) => {
                let mapping = TypeMapping::for_string(text.len());
                let mut bytes = text.as_bytes().to_vec();
                bytes.resize(mapping.size, 0);
                (mapping, bytes)
            }
            AttrValue::Numeric(array) if array.kind() == HostKind::Complex => {
                return Err(TypeError::ComplexAttribute.into());
            }
            AttrValue::Numeric(array) if array.len() != 1 => {
                return Err(TypeError::MatrixAttribute(array.len()).into());
            }
            AttrValue::Numeric(array) => {
                let mapping = TypeMapping::for_kind(array.kind(), self.backend.native_order())?;
                (mapping, array.to_store_bytes().0)
            }
        };

        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Write)?;
        let obj = open_object(&mut scope, file, object)?;
        if scope.backend().attribute_exists(obj, attr).map_err(object_open(object))? {
            tracing::debug!("replacing existing attribute");
            scope
                .backend()
                .delete_attribute(obj, attr)
                .map_err(|source| ObjectError::Delete { name: attr.to_string(), source })?;
        }
        let space = scope.acquire(|b| b.create_scalar_space()).map_err(object_open(attr))?;
        let dtype = scope.acquire(|b| b.create_type(&mapping.on_disk)).map_err(TypeError::Store)?;
        let handle = scope
            .acquire(|b| b.create_attribute(obj, attr, dtype, space))
            .map_err(|source| ObjectError::Create { name: attr.to_string(), source })?;
        let mem_type = scope.acquire(|b| b.create_type(&mapping.in_memory)).map_err(TypeError::Store)?;
        scope.backend().write_attribute(handle, mem_type, &bytes).map_err(write_failed(attr))
    }

    /// Deletes an object and everything below it.
    pub fn delete_object<P: AsRef<Path>>(&mut self, path: P, name: &str) -> Result<()> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("delete_object", path = %path.display(), name).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Write)?;
        if !exists(&mut scope, file, name)? {
            return Err(ObjectError::NotFound(name.to_string()).into());
        }
        scope
            .backend()
            .delete_link(file, name)
            .map_err(|source| ObjectError::Delete { name: name.to_string(), source }.into())
    }

    /// Deletes attribute `attr` of object `object`.
    pub fn delete_attribute<P: AsRef<Path>>(
        &mut self,
        path: P,
        object: &str,
        attr: &str,
    ) -> Result<()> {
        let path = path.as_ref();
        let _span =
            tracing::debug_span!("delete_attribute", path = %path.display(), object, attr).entered();
        let mut scope = HandleScope::new(&mut self.backend);
        let file = open_container(&mut scope, path, OpenPolicy::Write)?;
        let obj = open_object(&mut scope, file, object)?;
        if !scope.backend().attribute_exists(obj, attr).map_err(object_open(object))? {
            return Err(ObjectError::AttributeNotFound {
                object: object.to_string(),
                attr: attr.to_string(),
            }
            .into());
        }
        scope
            .backend()
            .delete_attribute(obj, attr)
            .map_err(|source| ObjectError::Delete { name: attr.to_string(), source }.into())
    }
}

/// Reads a whole dataset with the default backend.
pub fn read_dataset<P: AsRef<Path>>(path: P, name: &str) -> Result<HostArray> {
    DatasetIo::new().read_dataset(path, name)
}

/// Reads a hyperslab of a dataset with the default backend.
pub fn read_dataset_slab<P: AsRef<Path>>(
    path: P,
    name: &str,
    request: &SlabRequest,
) -> Result<HostArray> {
    DatasetIo::new().read_dataset_slab(path, name, request)
}

/// Writes a whole dataset with the default backend.
pub fn write_dataset<P: AsRef<Path>>(path: P, name: &str, data: &HostArray) -> Result<()> {
    DatasetIo::new().write_dataset(path, name, data)
}

/// Writes a hyperslab of a dataset with the default backend.
pub fn write_dataset_slab<P: AsRef<Path>>(
    path: P,
    name: &str,
    data: &HostArray,
    request: &SlabRequest,
) -> Result<()> {
    DatasetIo::new().write_dataset_slab(path, name, data, request)
}

/// Creates a dataset with the default backend.
pub fn create_dataset<P: AsRef<Path>>(
    path: P,
    name: &str,
    shape: &[Bound],
    options: &CreateOptions,
) -> Result<()> {
    DatasetIo::new().create_dataset(path, name, shape, options)
}

/// Reads an attribute with the default backend.
pub fn read_attribute<P: AsRef<Path>>(path: P, object: &str, attr: &str) -> Result<AttrValue> {
    DatasetIo::new().read_attribute(path, object, attr)
}

/// Writes an attribute with the default backend.
pub fn write_attribute<P: AsRef<Path>>(
    path: P,
    object: &str,
    attr: &str,
    value: &AttrValue,
) -> Result<()> {
    DatasetIo::new().write_attribute(path, object, attr, value)
}

/// Deletes an object with the default backend.
pub fn delete_object<P: AsRef<Path>>(path: P, name: &str) -> Result<()> {
    DatasetIo::new().delete_object(path, name)
}

/// Deletes an attribute with the default backend.
pub fn delete_attribute<P: AsRef<Path>>(path: P, object: &str, attr: &str) -> Result<()> {
    DatasetIo::new().delete_attribute(path, object, attr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, ArrayD};

    #[test]
    fn missing_containers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none");
        let err = read_dataset(&path, "x").unwrap_err();
        assert!(matches!(err, Error::Container(ContainerError::Missing(_))));
        assert!(!path.exists());
        let err = write_dataset_slab(&path, "x", &HostArray::scalar(1.0), &SlabRequest::default())
            .unwrap_err();
        assert!(matches!(err, Error::Container(ContainerError::Missing(_))));
    }

    #[test]
    fn non_containers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, "hello").unwrap();
        let mut io = DatasetIo::new();
        io.backend_mut().set_error_reporting(true);
        let err = io.write_dataset(&path, "x", &HostArray::scalar(1.0)).unwrap_err();
        assert!(matches!(err, Error::Container(ContainerError::NotAContainer(_))));
        assert!(io.backend().error_reporting());
        assert_eq!(io.backend().open_handles(), 0);
    }

    #[test]
    fn groups_are_not_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c");
        write_dataset(&path, "/g/x", &HostArray::scalar(1i32)).unwrap();
        let err = read_dataset(&path, "/g").unwrap_err();
        assert!(matches!(err, Error::Object(ObjectError::Incompatible { .. })));
        let err = read_dataset(&path, "/g/y").unwrap_err();
        assert!(matches!(err, Error::Object(ObjectError::NotFound(_))));
    }

    #[test]
    fn overwrite_keeps_the_stored_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c");
        let ints: ArrayD<i16> = arr1(&[1, 2, 3]).into_dyn();
        write_dataset(&path, "x", &HostArray::from(ints)).unwrap();
        let reals: ArrayD<f64> = arr1(&[4., 5., 6.]).into_dyn();
        write_dataset(&path, "x", &HostArray::from(reals)).unwrap();
        let back = read_dataset(&path, "x").unwrap();
        assert_eq!(back.into_array::<i16>(), Some(arr1(&[4, 5, 6]).into_dyn()));

        let longer: ArrayD<f64> = arr1(&[1., 2., 3., 4.]).into_dyn();
        let err = write_dataset(&path, "x", &HostArray::from(longer)).unwrap_err();
        assert!(matches!(err, Error::Object(ObjectError::Incompatible { .. })));
        let complex = HostArray::scalar(num_complex::Complex64::new(1., 2.));
        let err = write_dataset_slab(&path, "x", &complex, &SlabRequest::new(vec![0], vec![1.into()]))
            .unwrap_err();
        assert!(matches!(err, Error::Type(TypeError::Mismatch { .. })));
    }

    #[test]
    fn create_validates_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c");
        let shape = [Bound::Finite(4), Bound::Infinite];
        let err = create_dataset(&path, "x", &shape, &CreateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Shape(ShapeError::UnlimitedWithoutChunks)));
        let options = CreateOptions::default().with_chunks(ChunkSpec::Explicit(vec![2]));
        let err = create_dataset(&path, "x", &shape, &options).unwrap_err();
        assert!(matches!(err, Error::Shape(ShapeError::WrongLength { rank: 2, len: 1, .. })));
        let options = CreateOptions::default().with_chunks(ChunkSpec::Auto);
        create_dataset(&path, "x", &shape, &options).unwrap();
        // a second create keeps the existing dataset
        create_dataset(&path, "x", &[Bound::Finite(1)], &CreateOptions::default()).unwrap();
        let back = read_dataset(&path, "x").unwrap();
        assert_eq!(back.shape(), &[4, 0]);
    }

    #[test]
    fn oversized_chunks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c");
        let shape = [Bound::Infinite, Bound::Infinite];
        let options = CreateOptions::default().with_chunks(ChunkSpec::Explicit(vec![1 << 33, 1 << 33]));
        let err = create_dataset(&path, "x", &shape, &options).unwrap_err();
        assert!(matches!(err, Error::Shape(ShapeError::ChunkTooLarge { limit: MAX_CHUNK_BYTES })));
        // 2^29 doubles are 2^32 bytes, one past the limit
        let options = CreateOptions::default().with_chunks(ChunkSpec::Explicit(vec![1 << 29, 1]));
        let err = create_dataset(&path, "x", &shape, &options).unwrap_err();
        assert!(matches!(err, Error::Shape(ShapeError::ChunkTooLarge { .. })));
        let options = CreateOptions::default().with_chunks(ChunkSpec::Explicit(vec![1 << 20, 1]));
        create_dataset(&path, "x", &shape, &options).unwrap();
    }

    #[test]
    fn rejected_writes_do_not_grow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c");
        let options = CreateOptions::default().with_chunks(ChunkSpec::Auto);
        create_dataset(&path, "x", &[Bound::Infinite], &options).unwrap();
        let complex: ArrayD<num_complex::Complex64> =
            arr1(&[num_complex::Complex64::new(1., 2.); 4]).into_dyn();
        let request = SlabRequest::new(vec![0], vec![Bound::Finite(4)]);
        let err = write_dataset_slab(&path, "x", &HostArray::from(complex), &request).unwrap_err();
        assert!(matches!(err, Error::Type(TypeError::Mismatch { .. })));
        assert_eq!(read_dataset(&path, "x").unwrap().shape(), &[0]);

        let short = HostArray::from(arr1(&[1.0, 2.0]).into_dyn());
        let err = write_dataset_slab(&path, "x", &short, &request).unwrap_err();
        assert!(matches!(err, Error::Shape(ShapeError::DataMismatch { data: 2, selected: 4 })));
        assert_eq!(read_dataset(&path, "x").unwrap().shape(), &[0]);
    }

    #[test]
    fn string_kind_cannot_be_a_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let options = CreateOptions::default().with_datatype(HostKind::String);
        let err = create_dataset(dir.path().join("c"), "x", &[Bound::Finite(1)], &options)
            .unwrap_err();
        assert!(matches!(err, Error::Type(TypeError::UnsupportedKind { .. })));
    }
}
