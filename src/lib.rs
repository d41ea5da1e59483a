#![doc = include_str!("../README.md")]
//! ## Operations
//!
//! - Reading
//!   - [`read_dataset`] / [`DatasetIo::read_dataset`] for whole datasets
//!   - [`read_dataset_slab`] / [`DatasetIo::read_dataset_slab`] for
//!     hyperslabs described by a [`SlabRequest`]
//!   - [`read_attribute`] / [`DatasetIo::read_attribute`]
//! - Writing
//!   - [`write_dataset`] to create or overwrite a whole dataset
//!   - [`write_dataset_slab`] to write into (and grow) an existing dataset
//!   - [`create_dataset`] to declare an extent, maximum extent and chunking
//!     up front, with [`suggest_chunk_shape`] behind [`ChunkSpec::Auto`]
//!   - [`write_attribute`]
//! - Deleting: [`delete_object`], [`delete_attribute`]
//!
//! The free functions use the bundled [`ZarrBackend`]. [`DatasetIo`] runs the
//! same operations against any [`Backend`].
//!
//! ## Axis order
//!
//! Host arrays are column-major; the store is row-major. Shapes and
//! selection vectors are given in host order and reversed on the way to the
//! store (see [`order`]), so a host array of shape `[4, 3]` is stored with
//! extent `[3, 4]` and reads back as `[4, 3]`.
//!
//! ## Limitations
//!
//! - Attributes are scalar numbers or text. Complex and multi-element
//!   attribute values are rejected.
//! - Only chunked datasets can grow, and only up to their maximum extent.
//! - A container must not be used by two operations at once.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs)]

pub mod chunk;
pub mod config;
pub mod dtype;
pub mod error;
pub mod file;
pub mod handles;
pub mod order;
pub mod selection;
pub mod store;
pub mod value;

#[cfg(feature = "nalgebra")]
mod impl_nalgebra;

pub use crate::{
    chunk::suggest_chunk_shape,
    dtype::HostKind,
    error::{Error, Result},
    file::{
        create_dataset, delete_attribute, delete_object, read_attribute, read_dataset,
        read_dataset_slab, write_attribute, write_dataset, write_dataset_slab, ChunkSpec,
        CreateOptions, DatasetIo,
    },
    selection::{shape_from_host, Bound, SlabRequest},
    store::{Backend, ZarrBackend},
    value::{AttrValue, HostArray},
};
