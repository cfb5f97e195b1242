//! Dense block kernels used by the blocked reverse passes.
//!
//! The kernel set is picked at build time: [`CpuKernels`] by default,
//! [`RayonKernels`] when the `parallel` feature is enabled. Both produce the
//! same results up to floating-point summation order.

use nalgebra::{DMatrix, Dyn, Matrix, Storage};

use crate::var::MatrixFloat;

/// Matrix products and triangular inverses over arbitrary dense storage.
pub trait BlockKernels<F: MatrixFloat> {
    /// Short name for logs.
    const NAME: &'static str;

    /// `a * b`.
    fn matmul<SA, SB>(a: &Matrix<F, Dyn, Dyn, SA>, b: &Matrix<F, Dyn, Dyn, SB>) -> DMatrix<F>
    where
        SA: Storage<F, Dyn, Dyn>,
        SB: Storage<F, Dyn, Dyn>;

    /// Inverse of a lower-triangular matrix. `None` on a zero pivot.
    fn tri_inverse<S>(lower: &Matrix<F, Dyn, Dyn, S>) -> Option<DMatrix<F>>
    where
        S: Storage<F, Dyn, Dyn>;
}

/// Single-threaded nalgebra kernels.
pub struct CpuKernels;

impl<F: MatrixFloat> BlockKernels<F> for CpuKernels {
    const NAME: &'static str = "cpu";

    fn matmul<SA, SB>(a: &Matrix<F, Dyn, Dyn, SA>, b: &Matrix<F, Dyn, Dyn, SB>) -> DMatrix<F>
    where
        SA: Storage<F, Dyn, Dyn>,
        SB: Storage<F, Dyn, Dyn>,
    {
        assert_eq!(a.ncols(), b.nrows(), "matmul: inner dimensions differ");
        let mut out = DMatrix::zeros(a.nrows(), b.ncols());
        out.gemm(F::one(), a, b, F::zero());
        out
    }

    fn tri_inverse<S>(lower: &Matrix<F, Dyn, Dyn, S>) -> Option<DMatrix<F>>
    where
        S: Storage<F, Dyn, Dyn>,
    {
        let n = lower.nrows();
        lower.solve_lower_triangular(&DMatrix::<F>::identity(n, n))
    }
}

/// Column-panel parallel kernels on the rayon thread pool.
#[cfg(feature = "parallel")]
pub struct RayonKernels;

#[cfg(feature = "parallel")]
const PANEL_COLS: usize = 64;

#[cfg(feature = "parallel")]
impl<F: MatrixFloat> BlockKernels<F> for RayonKernels {
    const NAME: &'static str = "rayon";

    fn matmul<SA, SB>(a: &Matrix<F, Dyn, Dyn, SA>, b: &Matrix<F, Dyn, Dyn, SB>) -> DMatrix<F>
    where
        SA: Storage<F, Dyn, Dyn>,
        SB: Storage<F, Dyn, Dyn>,
    {
        use rayon::prelude::*;

        let n = b.ncols();
        if n <= PANEL_COLS {
            return <CpuKernels as BlockKernels<F>>::matmul(a, b);
        }
        assert_eq!(a.ncols(), b.nrows(), "matmul: inner dimensions differ");

        // Owned copies are Sync regardless of the caller's storage.
        let a = a.clone_owned();
        let b = b.clone_owned();
        let starts: Vec<usize> = (0..n).step_by(PANEL_COLS).collect();
        let panels: Vec<(usize, DMatrix<F>)> = starts
            .into_par_iter()
            .map(|c0| {
                let width = PANEL_COLS.min(n - c0);
                (c0, <CpuKernels as BlockKernels<F>>::matmul(&a, &b.columns(c0, width)))
            })
            .collect();

        let mut out = DMatrix::zeros(a.nrows(), n);
        for (c0, panel) in panels {
            out.columns_mut(c0, panel.ncols()).copy_from(&panel);
        }
        out
    }

    fn tri_inverse<S>(lower: &Matrix<F, Dyn, Dyn, S>) -> Option<DMatrix<F>>
    where
        S: Storage<F, Dyn, Dyn>,
    {
        <CpuKernels as BlockKernels<F>>::tri_inverse(lower)
    }
}

/// Kernels used by [`cholesky_decompose`](crate::cholesky::cholesky_decompose).
#[cfg(not(feature = "parallel"))]
pub type DefaultKernels = CpuKernels;

/// Kernels used by [`cholesky_decompose`](crate::cholesky::cholesky_decompose).
#[cfg(feature = "parallel")]
pub type DefaultKernels = RayonKernels;
