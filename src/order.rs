//! Translation between the host's axis order and the store's axis order.
//!
//! The host addresses arrays column-major (the first axis varies fastest) and
//! the store addresses them row-major (the last axis varies fastest). A host
//! array of shape `[a, b, c]` therefore corresponds to a stored array of
//! shape `[c, b, a]`, and every extent or selection vector crosses the
//! boundary reversed.
//!
//! Vectors carry their ordering in the type, so a host-order vector cannot be
//! handed to the store by accident:
//!
//! ```
//! use hslab::order::{Host, AxisVec};
//!
//! let host = AxisVec::<u64, Host>::new(vec![4, 3]);
//! let store = host.clone().reorder();
//! assert_eq!(store.as_slice(), &[3, 4]);
//! assert_eq!(store.reorder(), host);
//! ```

use ndarray::{ArrayD, IxDyn, ShapeBuilder as _};
use std::{fmt, marker::PhantomData, ops::Index};

mod sealed {
    pub trait Sealed {}
}

/// One of the two axis orderings.
pub trait AxisOrder: sealed::Sealed + fmt::Debug + Clone + Copy + PartialEq + Eq {
    /// The opposite ordering.
    type Reversed: AxisOrder<Reversed = Self>;
    /// Name used in debug output.
    const NAME: &'static str;
}

/// Host ordering: the first axis varies fastest in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {}

/// Store ordering: the last axis varies fastest in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {}

impl sealed::Sealed for Host {}
impl sealed::Sealed for Store {}

impl AxisOrder for Host {
    type Reversed = Store;
    const NAME: &'static str = "host";
}

impl AxisOrder for Store {
    type Reversed = Host;
    const NAME: &'static str = "store";
}

/// A per-axis vector tagged with the ordering it is expressed in.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AxisVec<T, O> {
    values: Vec<T>,
    order: PhantomData<O>,
}

/// A vector in host order.
pub type HostVec<T> = AxisVec<T, Host>;
/// A vector in store order.
pub type StoreVec<T> = AxisVec<T, Store>;

impl<T, O: AxisOrder> AxisVec<T, O> {
    /// Tags `values` as being in ordering `O`.
    pub fn new(values: Vec<T>) -> Self {
        Self { values, order: PhantomData }
    }

    /// Expresses the same vector in the opposite ordering.
    ///
    /// Reordering twice gives back the original vector.
    #[must_use]
    pub fn reorder(self) -> AxisVec<T, O::Reversed> {
        let mut values = self.values;
        values.reverse();
        AxisVec::new(values)
    }

    /// Number of axes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no axes (a scalar).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The values in this vector's ordering.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Unwraps the values in this vector's ordering.
    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    /// Iterates over the values in this vector's ordering.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Applies `f` to every entry, keeping the ordering.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> AxisVec<U, O> {
        AxisVec::new(self.values.iter().map(f).collect())
    }
}

impl<T, O: AxisOrder> Default for AxisVec<T, O> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T, O> Index<usize> for AxisVec<T, O> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.values[index]
    }
}

impl<T: fmt::Debug, O: AxisOrder> fmt::Debug for AxisVec<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", O::NAME, self.values)
    }
}

/// Reverses a host-order vector into store order.
pub fn to_store_order<T>(v: HostVec<T>) -> StoreVec<T> {
    v.reorder()
}

/// Reverses a store-order vector into host order.
pub fn to_host_order<T>(v: StoreVec<T>) -> HostVec<T> {
    v.reorder()
}

/// Linearizes a host array in the order the store expects it.
///
/// Returns the elements with the last store axis varying fastest, together
/// with the store-order extent. This is the host's column-major sequence, so
/// a Fortran-layout array is copied straight through and any other layout is
/// permuted. Rank 0 and rank 1 arrays come out in their own order.
pub fn to_store_layout<A: Clone>(array: &ArrayD<A>) -> (Vec<A>, StoreVec<usize>) {
    let dims = HostVec::new(array.shape().to_vec()).reorder();
    let view = array.view().reversed_axes();
    let data = match view.as_slice() {
        Some(slice) => slice.to_vec(),
        None => view.iter().cloned().collect(),
    };
    (data, dims)
}

/// Rebuilds a host array from elements in store layout.
///
/// Inverse of [`to_store_layout`]. Returns `None` if `data` does not hold
/// exactly as many elements as `dims` describes.
pub fn from_store_layout<A>(dims: StoreVec<usize>, data: Vec<A>) -> Option<ArrayD<A>> {
    let shape = dims.reorder().into_vec();
    ArrayD::from_shape_vec(IxDyn(&shape).f(), data).ok()
}
