use crate::selection::{Bound, Hyperslab};
use std::ops::Range;

/// Which elements of a dataspace are selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Selection {
    All,
    /// Selected coordinates per axis, ascending.
    Slab(Vec<Vec<u64>>),
}

/// A rectangular extent in store order plus a regular selection on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Dataspace {
    pub dims: Vec<u64>,
    /// `None` entries are unlimited.
    pub maxdims: Vec<Option<u64>>,
    pub selection: Selection,
}

impl Dataspace {
    pub fn scalar() -> Self {
        Self { dims: Vec::new(), maxdims: Vec::new(), selection: Selection::All }
    }

    pub fn simple(dims: &[u64], max: Option<&[Bound]>) -> Self {
        let maxdims = match max {
            Some(max) => max.iter().map(|b| b.finite()).collect(),
            None => dims.iter().map(|&n| Some(n)).collect(),
        };
        Self { dims: dims.to_vec(), maxdims, selection: Selection::All }
    }

    pub fn max_bounds(&self) -> Vec<Bound> {
        self.maxdims.iter().map(|m| m.map_or(Bound::Infinite, Bound::Finite)).collect()
    }

    /// Total number of elements in the extent.
    pub fn num_points(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Number of selected elements.
    pub fn num_selected(&self) -> u64 {
        match &self.selection {
            Selection::All => self.num_points(),
            Selection::Slab(axes) => axes.iter().map(|a| a.len() as u64).product(),
        }
    }

    /// Replaces the selection with `slab`.
    ///
    /// Fails if the ranks differ or the slab has a zero stride, block or
    /// count. The selection may lie outside the extent; see
    /// [`Dataspace::selection_valid`].
    pub fn select_hyperslab(&mut self, slab: &Hyperslab) -> Result<(), String> {
        if slab.rank() != self.dims.len() {
            return Err(format!(
                "hyperslab of rank {} on a dataspace of rank {}",
                slab.rank(),
                self.dims.len()
            ));
        }
        let mut axes = Vec::with_capacity(slab.rank());
        for i in 0..slab.rank() {
            let (start, stride, count, block) =
                (slab.start[i], slab.stride[i], slab.count[i], slab.block[i]);
            if stride == 0 || block == 0 || count == 0 {
                return Err(format!("empty or degenerate hyperslab along axis {i}"));
            }
            if block > stride {
                return Err(format!("block {block} larger than stride {stride} along axis {i}"));
            }
            let coords = (0..count)
                .flat_map(|c| (0..block).map(move |b| start + c * stride + b))
                .collect();
            axes.push(coords);
        }
        self.selection = Selection::Slab(axes);
        Ok(())
    }

    /// Whether every selected element lies within the extent.
    pub fn selection_valid(&self) -> bool {
        match &self.selection {
            Selection::All => true,
            Selection::Slab(axes) => axes
                .iter()
                .zip(&self.dims)
                .all(|(coords, &dim)| coords.last().map_or(true, |&last| last < dim)),
        }
    }

    /// Calls `f` with the coordinates of every selected element, the last
    /// axis varying fastest.
    pub fn for_each_selected<F: FnMut(&[u64])>(&self, mut f: F) {
        let axes: Vec<Vec<u64>> = match &self.selection {
            Selection::All => self.dims.iter().map(|&n| (0..n).collect()).collect(),
            Selection::Slab(axes) => axes.clone(),
        };
        if axes.iter().any(|a| a.is_empty()) {
            return;
        }
        let mut pos = vec![0; axes.len()];
        let mut coords: Vec<u64> = axes.iter().map(|a| a[0]).collect();
        loop {
            f(&coords);
            let mut axis = axes.len();
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                pos[axis] += 1;
                if pos[axis] < axes[axis].len() {
                    coords[axis] = axes[axis][pos[axis]];
                    break;
                }
                pos[axis] = 0;
                coords[axis] = axes[axis][0];
            }
        }
    }

    /// The smallest box holding every selected element, one range per
    /// axis. Empty selections give empty ranges.
    pub fn bounding_box(&self) -> Vec<Range<u64>> {
        match &self.selection {
            Selection::All => self.dims.iter().map(|&n| 0..n).collect(),
            Selection::Slab(axes) => axes
                .iter()
                .map(|coords| match (coords.first(), coords.last()) {
                    (Some(&first), Some(&last)) => first..last + 1,
                    _ => 0..0,
                })
                .collect(),
        }
    }

    /// Whether the selection fills its bounding box.
    pub fn is_dense(&self) -> bool {
        match &self.selection {
            Selection::All => true,
            Selection::Slab(axes) => axes.iter().all(|coords| match (coords.first(), coords.last()) {
                (Some(&first), Some(&last)) => last - first + 1 == coords.len() as u64,
                _ => true,
            }),
        }
    }

    /// Calls `f` with the row-major index, within `region`, of every
    /// selected element, in selection order.
    pub fn for_each_in_box<F: FnMut(u64)>(&self, region: &[Range<u64>], mut f: F) {
        let dims: Vec<u64> = region.iter().map(|r| r.end - r.start).collect();
        let mut rel = vec![0; dims.len()];
        self.for_each_selected(|coords| {
            for ((r, &c), range) in rel.iter_mut().zip(coords).zip(region) {
                *r = c - range.start;
            }
            f(linear_index(&rel, &dims));
        });
    }

    /// Row-major linear indices of the selected elements, in selection
    /// order.
    pub fn selected_offsets(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.num_selected() as usize);
        self.for_each_selected(|coords| out.push(linear_index(coords, &self.dims)));
        out
    }
}

/// Row-major linear index of `coords` in an extent of `dims`.
pub(crate) fn linear_index(coords: &[u64], dims: &[u64]) -> u64 {
    coords.iter().zip(dims).fold(0, |acc, (&c, &d)| acc * d + c)
}
