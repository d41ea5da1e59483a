use crate::value::{Element, HostArray};
use nalgebra::{DMatrix, Scalar};
use ndarray::{ArrayD, IxDyn};

impl<T: Element + Scalar> From<DMatrix<T>> for HostArray {
    fn from(matrix: DMatrix<T>) -> Self {
        let (rows, cols) = matrix.shape();
        ArrayD::from_shape_fn(IxDyn(&[rows, cols]), |idx| matrix[(idx[0], idx[1])]).into()
    }
}

impl HostArray {
    /// Unwraps a rank-2 array of `T` as a matrix. Rank-1 arrays become
    /// column vectors.
    pub fn into_matrix<T: Element + Scalar>(self) -> Option<DMatrix<T>> {
        let array = self.into_array::<T>()?;
        match *array.shape() {
            [rows] => Some(DMatrix::from_iterator(rows, 1, array.iter().copied())),
            [rows, cols] => Some(DMatrix::from_fn(rows, cols, |i, j| array[IxDyn(&[i, j])])),
            _ => None,
        }
    }
}
