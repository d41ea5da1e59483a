use crate::{dtype::HostKind, store::StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type of the dataset operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error from one of the dataset operations.
///
/// Each variant corresponds to one category of failure. None of them are
/// retried; the handles opened by the failing operation have already been
/// released by the time the error reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The container file is missing, invalid, or could not be opened.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// A dataset, group or attribute is missing or incompatible.
    #[error(transparent)]
    Object(#[from] ObjectError),
    /// The selection or the shape of the data is invalid.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// The host value kind or the stored element type is unsupported.
    #[error(transparent)]
    Type(#[from] TypeError),
    /// The bulk read or write failed after a valid selection.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// An error opening or creating the container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The file does not exist and the operation does not create it.
    #[error("the file {0} does not exist")]
    Missing(PathBuf),
    /// The path exists but is not a container.
    #[error("the file {0} is not a valid container")]
    NotAContainer(PathBuf),
    /// Checking or opening an existing container failed.
    #[error("opening the file {path} failed: {source}")]
    Open {
        /// Container path.
        path: PathBuf,
        /// Underlying store error.
        source: StoreError,
    },
    /// Creating a new container failed.
    #[error("creating the file {path} failed: {source}")]
    Create {
        /// Container path.
        path: PathBuf,
        /// Underlying store error.
        source: StoreError,
    },
}

/// An error resolving a dataset, group or attribute.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// The object does not exist.
    #[error("the object {0} does not exist")]
    NotFound(String),
    /// The object exists but could not be opened or queried.
    #[error("error opening {name}: {source}")]
    Open {
        /// Object path.
        name: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// The object could not be created.
    #[error("could not create {name}: {source}")]
    Create {
        /// Object path.
        name: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// The object exists in a form that cannot take the requested operation.
    #[error("{name} already exists in an incompatible form: {reason}")]
    Incompatible {
        /// Object path.
        name: String,
        /// What did not match.
        reason: String,
    },
    /// The object has no attribute of that name.
    #[error("the object {object} does not have an attribute {attr}")]
    AttributeNotFound {
        /// Object path.
        object: String,
        /// Attribute name.
        attr: String,
    },
    /// Deleting the object or attribute failed.
    #[error("error when deleting {name}: {source}")]
    Delete {
        /// Object path or attribute name.
        name: String,
        /// Underlying store error.
        source: StoreError,
    },
}

/// An error in a selection vector, an extent or the shape of the data.
///
/// Axis numbers are 1-based and counted in host order.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// A selection vector does not have one entry per axis.
    #[error("{name} must be a vector of length {rank}, the dataset rank (got {len})")]
    WrongLength {
        /// Name of the vector.
        name: &'static str,
        /// Dataset rank.
        rank: usize,
        /// Length supplied.
        len: usize,
    },
    /// A selection was given for a rank-0 dataset.
    #[error("cannot specify hyperslab for scalar datasets (rank 0)")]
    ScalarSelection,
    /// A vector that must hold positive integers holds something else.
    #[error("{0} can only contain positive integers")]
    NotPositive(&'static str),
    /// A vector that must hold non-negative integers holds something else.
    #[error("{0} can only contain non-negative integers")]
    NotNonNegative(&'static str),
    /// `block` was given without `stride`.
    #[error("block can only be specified together with stride")]
    BlockWithoutStride,
    /// `stride < block` along an axis.
    #[error("in dimension {axis}, requested stride {stride} smaller than block size {block}")]
    StrideBelowBlock {
        /// Host axis (1-based).
        axis: usize,
        /// Requested stride.
        stride: u64,
        /// Requested block.
        block: u64,
    },
    /// The selection reaches past the current extent on read.
    #[error(
        "in dimension {axis}, dataset only has {extent} elements, but at least {required} are \
         required for requested hyperslab"
    )]
    ExceedsExtent {
        /// Host axis (1-based).
        axis: usize,
        /// Current extent.
        extent: u64,
        /// Exclusive end of the selection.
        required: u64,
    },
    /// The selection reaches past the maximum extent on write.
    #[error(
        "in dimension {axis}, the dataset may have at max. only {max} elements, but at least \
         {required} are required for requested hyperslab"
    )]
    ExceedsMaximum {
        /// Host axis (1-based).
        axis: usize,
        /// Maximum extent.
        max: u64,
        /// Exclusive end of the selection.
        required: u64,
    },
    /// The selection addresses more elements than fit in memory or in an
    /// axis index.
    #[error("in dimension {axis}, requested hyperslab is too large to address")]
    SelectionTooLarge {
        /// Host axis (1-based).
        axis: usize,
    },
    /// A zero or infinite count was given for a write.
    #[error("in dimension {axis}, count must be a positive integer when writing")]
    UnboundedCount {
        /// Host axis (1-based).
        axis: usize,
    },
    /// The data does not fill the selection exactly.
    #[error("data has {data} elements, but the selection covers {selected}")]
    DataMismatch {
        /// Number of data elements.
        data: usize,
        /// Number of selected elements.
        selected: u64,
    },
    /// A chunk holds more bytes than a single chunk may.
    #[error("chunk size exceeds the limit of {limit} bytes per chunk")]
    ChunkTooLarge {
        /// Largest chunk in bytes.
        limit: u64,
    },
    /// An unlimited axis was declared without a chunk shape.
    #[error("if the size contains an Inf or zero element, then a chunk size must be specified")]
    UnlimitedWithoutChunks,
    /// Selecting the hyperslab in the store failed.
    #[error("error when selecting the hyperslab: {0}")]
    Select(#[source] StoreError),
    /// Growing the dataset failed.
    #[error("error when setting new extent of the dataset: {0}")]
    Resize(#[source] StoreError),
}

/// An error mapping between host kinds and stored element types.
#[derive(Debug, Error)]
pub enum TypeError {
    /// The datatype name is not one of the known host kinds.
    #[error("invalid datatype {0}")]
    UnknownName(String),
    /// The stored element type has no host kind.
    #[error("unsupported element type {0}")]
    UnsupportedStoreType(String),
    /// The host kind cannot be used in this position.
    #[error("{kind} values are not supported for {context}")]
    UnsupportedKind {
        /// The rejected kind.
        kind: HostKind,
        /// Where it was rejected.
        context: &'static str,
    },
    /// Complex values cannot be stored as attributes.
    #[error(
        "complex values are not supported as attributes; save real and imaginary parts separately"
    )]
    ComplexAttribute,
    /// Only scalar attributes can be written.
    #[error("matrix type attributes are not supported; got {0} elements")]
    MatrixAttribute(usize),
    /// The stored type and the host data are not convertible.
    #[error("{name} holds {stored} data, which cannot take {kind} values")]
    Mismatch {
        /// Dataset path.
        name: String,
        /// Stored element type.
        stored: String,
        /// Host kind supplied.
        kind: HostKind,
    },
    /// The store failed to create or describe a datatype.
    #[error("datatype error: {0}")]
    Store(#[source] StoreError),
}

/// An error in the bulk transfer itself.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading the selection failed.
    #[error("error when reading {name}: {source}")]
    Read {
        /// Dataset or attribute path.
        name: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// Writing the selection failed.
    #[error("error when writing {name}: {source}")]
    Write {
        /// Dataset or attribute path.
        name: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// The bytes read do not describe an array of the expected shape.
    #[error("error when reading {name}: transferred buffer does not match shape {shape:?}")]
    Layout {
        /// Dataset or attribute path.
        name: String,
        /// Host shape expected.
        shape: Vec<usize>,
    },
}
