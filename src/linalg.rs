//! Triangular helpers used by the blocked reverse kernels.
//!
//! All functions work in place on any dense storage, including views into
//! arena buffers.

use nalgebra::{Dyn, Matrix, StorageMut};

use crate::Float;

/// Copy the strict lower triangle onto the upper one.
pub fn reflect_lower_to_upper<F, S>(m: &mut Matrix<F, Dyn, Dyn, S>)
where
    F: Float,
    S: StorageMut<F, Dyn, Dyn>,
{
    assert!(m.is_square(), "reflect_lower_to_upper: matrix must be square");
    let n = m.nrows();
    for col in 1..n {
        for row in 0..col {
            m[(row, col)] = m[(col, row)];
        }
    }
}

/// Zero everything above the diagonal.
pub fn mask_lower<F, S>(m: &mut Matrix<F, Dyn, Dyn, S>)
where
    F: Float,
    S: StorageMut<F, Dyn, Dyn>,
{
    let rows = m.nrows();
    for col in 1..m.ncols() {
        for row in 0..col.min(rows) {
            m[(row, col)] = F::zero();
        }
    }
}

/// Scale the main diagonal by `s`.
pub fn diagonal_multiply<F, S>(m: &mut Matrix<F, Dyn, Dyn, S>, s: F)
where
    F: Float,
    S: StorageMut<F, Dyn, Dyn>,
{
    for i in 0..m.nrows().min(m.ncols()) {
        m[(i, i)] = m[(i, i)] * s;
    }
}
