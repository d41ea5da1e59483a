//! Hyperslab selections: validation, auto-fill and bounds checking.
//!
//! A request arrives in host order with 0-based starts. [`resolve`] checks it
//! against the dataset's extents, fills in omitted strides and blocks, turns
//! "fill" counts into concrete counts on read, and reports how far the
//! dataset must grow on write.
use crate::{
    error::ShapeError,
    order::{HostVec, StoreVec},
};

/// A per-axis length that may be unbounded.
///
/// As a count, `Finite(0)` and `Infinite` both ask for as many elements as
/// fit. As a maximum extent, `Infinite` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    /// A concrete length.
    Finite(u64),
    /// No bound.
    Infinite,
}

impl Bound {
    /// Converts a host number: `+inf` is unbounded, a non-negative integer is
    /// finite, anything else is rejected.
    pub fn from_host(value: f64) -> Option<Self> {
        if value == f64::INFINITY {
            Some(Self::Infinite)
        } else if value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 {
            Some(Self::Finite(value as u64))
        } else {
            None
        }
    }

    /// Whether this count asks for as many elements as fit.
    pub fn is_fill(self) -> bool {
        matches!(self, Self::Finite(0) | Self::Infinite)
    }

    /// The length, if bounded.
    pub fn finite(self) -> Option<u64> {
        match self {
            Self::Finite(n) => Some(n),
            Self::Infinite => None,
        }
    }
}

impl From<u64> for Bound {
    fn from(n: u64) -> Self {
        Self::Finite(n)
    }
}

/// Whether a selection is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Counts may be filled; the selection must lie within the current
    /// extent.
    Read,
    /// Counts must be concrete; the selection must lie within the maximum
    /// extent and the dataset grows to hold it.
    Write,
}

/// A caller's hyperslab request in host order with 0-based starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlabRequest {
    start: HostVec<u64>,
    count: HostVec<Bound>,
    stride: Option<HostVec<u64>>,
    block: Option<HostVec<u64>>,
}

impl SlabRequest {
    /// Selects `count` elements per axis beginning at `start`, with unit
    /// stride and block.
    pub fn new(start: Vec<u64>, count: Vec<Bound>) -> Self {
        Self { start: HostVec::new(start), count: HostVec::new(count), stride: None, block: None }
    }

    /// The empty request, the only one a scalar dataset accepts.
    pub fn whole_scalar() -> Self {
        Self::default()
    }

    /// Sets the distance between the starts of consecutive blocks.
    #[must_use]
    pub fn with_stride(mut self, stride: Vec<u64>) -> Self {
        self.stride = Some(HostVec::new(stride));
        self
    }

    /// Sets the number of contiguous elements in each block.
    #[must_use]
    pub fn with_block(mut self, block: Vec<u64>) -> Self {
        self.block = Some(HostVec::new(block));
        self
    }

    /// Builds a request from host arguments.
    ///
    /// `start` is 1-based. `start`, `stride` and `block` must hold positive
    /// integers; `count` holds non-negative integers or `+inf`. `block` may
    /// only be given together with `stride`.
    pub fn from_host(
        start: &[f64],
        count: &[f64],
        stride: Option<&[f64]>,
        block: Option<&[f64]>,
    ) -> Result<Self, ShapeError> {
        if block.is_some() && stride.is_none() {
            return Err(ShapeError::BlockWithoutStride);
        }
        let start = positive(start, "start")?.into_iter().map(|s| s - 1).collect();
        let count = count
            .iter()
            .map(|&c| Bound::from_host(c).ok_or(ShapeError::NotNonNegative("count")))
            .collect::<Result<_, _>>()?;
        let mut request = Self::new(start, count);
        if let Some(stride) = stride {
            request = request.with_stride(positive(stride, "stride")?);
        }
        if let Some(block) = block {
            request = request.with_block(positive(block, "block")?);
        }
        Ok(request)
    }

    /// Whether no vector holds any entry.
    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
            && self.count.is_empty()
            && self.stride.as_ref().map_or(true, |s| s.is_empty())
            && self.block.as_ref().map_or(true, |b| b.is_empty())
    }
}

/// Parses a host extent of non-negative integers or `+inf`. Zero and `+inf`
/// entries declare unlimited axes when creating a dataset.
pub fn shape_from_host(values: &[f64]) -> Result<Vec<Bound>, ShapeError> {
    values
        .iter()
        .map(|&v| Bound::from_host(v).ok_or(ShapeError::NotNonNegative("size")))
        .collect()
}

fn positive(values: &[f64], name: &'static str) -> Result<Vec<u64>, ShapeError> {
    values
        .iter()
        .map(|&v| match Bound::from_host(v) {
            Some(Bound::Finite(n)) if n > 0 => Ok(n),
            _ => Err(ShapeError::NotPositive(name)),
        })
        .collect()
}

/// A validated regular selection in store order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperslab {
    /// First selected index per axis.
    pub start: StoreVec<u64>,
    /// Distance between block starts.
    pub stride: StoreVec<u64>,
    /// Number of blocks.
    pub count: StoreVec<u64>,
    /// Elements per block.
    pub block: StoreVec<u64>,
}

impl Hyperslab {
    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.start.len()
    }

    /// Number of selected elements, or `None` if it does not fit in a `u64`.
    pub fn num_elements(&self) -> Option<u64> {
        self.count
            .iter()
            .zip(self.block.iter())
            .try_fold(1u64, |n, (c, b)| n.checked_mul(c.checked_mul(*b)?))
    }

    /// Exclusive end of the selection along store axis `i`.
    pub fn end(&self, i: usize) -> u64 {
        end(self.start[i], self.stride[i], self.count[i], self.block[i])
    }
}

/// The outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    /// The selection to apply to the stored dataspace.
    pub slab: Hyperslab,
    /// New extent the dataset must be grown to before a write, if any.
    pub grow_to: Option<StoreVec<u64>>,
    /// Shape of the selected data in host order.
    pub result_shape: HostVec<usize>,
}

fn end(start: u64, stride: u64, count: u64, block: u64) -> u64 {
    start
        .saturating_add(stride.saturating_mul(count.saturating_sub(1)))
        .saturating_add(block)
}

fn checked_end(start: u64, stride: u64, count: u64, block: u64) -> Option<u64> {
    start.checked_add(stride.checked_mul(count.checked_sub(1)?)?)?.checked_add(block)
}

/// Validates `request` against a dataset of extent `current` and maximum
/// extent `max`, both in store order.
///
/// Stride and block are checked on every axis before any extent is looked
/// at. Errors name axes 1-based in host order.
pub fn resolve(
    request: &SlabRequest,
    current: &StoreVec<u64>,
    max: &StoreVec<Bound>,
    access: Access,
) -> Result<ResolvedSelection, ShapeError> {
    let rank = current.len();
    if rank == 0 {
        if !request.is_empty() {
            return Err(ShapeError::ScalarSelection);
        }
        let empty = StoreVec::new(vec![]);
        return Ok(ResolvedSelection {
            slab: Hyperslab {
                start: empty.clone(),
                stride: empty.clone(),
                count: empty.clone(),
                block: empty,
            },
            grow_to: None,
            result_shape: HostVec::new(vec![]),
        });
    }

    let check_len = |name, len| {
        if len == rank {
            Ok(())
        } else {
            Err(ShapeError::WrongLength { name, rank, len })
        }
    };
    check_len("start", request.start.len())?;
    check_len("count", request.count.len())?;
    let ones = || HostVec::new(vec![1; rank]);
    let stride = request.stride.clone().unwrap_or_else(ones);
    check_len("stride", stride.len())?;
    let block = request.block.clone().unwrap_or_else(ones);
    check_len("block", block.len())?;
    if stride.iter().any(|&s| s == 0) {
        return Err(ShapeError::NotPositive("stride"));
    }
    if block.iter().any(|&b| b == 0) {
        return Err(ShapeError::NotPositive("block"));
    }

    let start = request.start.clone().reorder();
    let count = request.count.clone().reorder();
    let stride = stride.reorder();
    let block = block.reorder();
    let axis = |i: usize| rank - i;

    for i in 0..rank {
        if stride[i] < block[i] {
            return Err(ShapeError::StrideBelowBlock {
                axis: axis(i),
                stride: stride[i],
                block: block[i],
            });
        }
    }

    let mut counts = Vec::with_capacity(rank);
    let mut result_shape = Vec::with_capacity(rank);
    let mut total = 1usize;
    let mut grown = current.as_slice().to_vec();
    for i in 0..rank {
        let n = match (count[i], access) {
            (Bound::Finite(n), _) if n > 0 => n,
            (_, Access::Read) => {
                let required = start[i].saturating_add(block[i]);
                if required > current[i] {
                    return Err(ShapeError::ExceedsExtent {
                        axis: axis(i),
                        extent: current[i],
                        required,
                    });
                }
                (current[i] - required) / stride[i] + 1
            }
            (_, Access::Write) => return Err(ShapeError::UnboundedCount { axis: axis(i) }),
        };
        let too_large = || ShapeError::SelectionTooLarge { axis: axis(i) };
        let required = checked_end(start[i], stride[i], n, block[i]).ok_or_else(too_large)?;
        let len = n
            .checked_mul(block[i])
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(too_large)?;
        total = total.checked_mul(len).ok_or_else(too_large)?;
        match access {
            Access::Read if required > current[i] => {
                return Err(ShapeError::ExceedsExtent {
                    axis: axis(i),
                    extent: current[i],
                    required,
                });
            }
            Access::Read => {}
            Access::Write => {
                if let Bound::Finite(max) = max[i] {
                    if required > max {
                        return Err(ShapeError::ExceedsMaximum { axis: axis(i), max, required });
                    }
                }
                grown[i] = grown[i].max(required);
            }
        }
        counts.push(n);
        result_shape.push(len);
    }

    let count = StoreVec::new(counts);
    let grow_to = (grown.as_slice() != current.as_slice()).then(|| StoreVec::new(grown));
    Ok(ResolvedSelection {
        slab: Hyperslab { start, stride, count, block },
        grow_to,
        result_shape: StoreVec::new(result_shape).reorder(),
    })
}
