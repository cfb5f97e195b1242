//! Differentiable Cholesky factorization with a blocked reverse pass.
//!
//! The forward pass factors `A = L Lᵀ` with nalgebra. The reverse pass walks
//! the factor in square diagonal blocks from the bottom-right corner upward.
//! At each block boundary `j..k` the factor splits into
//!
//! ```text
//!        0      j      k      n
//!     j  ┌──────┐
//!        │  R   │  D
//!     k  ├──────┼──────┐
//!        │  B   │  C   │ (done)
//!     n  └──────┴──────┘
//! ```
//!
//! and the adjoint flows panel `C` to diagonal `D` to row `R`. Only the
//! lower triangle of `A` is a degree of freedom, so the final adjoint is
//! masked to it before being added into `A`'s adjoint.

use nalgebra::{Cholesky, DMatrix, DMatrixView, DMatrixViewMut};
use tracing::trace;

use crate::arena_type::ArenaMatrix;
use crate::check::{check_no_nan, check_square, check_symmetric};
use crate::dispatch::{BlockKernels, DefaultKernels};
use crate::episode::{with_active_episode, Episode};
use crate::error::AdError;
use crate::linalg::{diagonal_multiply, mask_lower, reflect_lower_to_upper};
use crate::ops::matrix::add_scaled;
use crate::tape::ChainContext;
use crate::var::{MatrixFloat, Var};

const FUNCTION: &str = "cholesky_decompose";

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
///
/// Validation runs before anything is scheduled: `A` must be square, finite,
/// symmetric and positive definite.
pub fn cholesky_decompose<F: MatrixFloat>(a: &Var<DMatrix<F>>) -> Result<Var<DMatrix<F>>, AdError> {
    with_active_episode(|ep| cholesky_decompose_in(ep, a))
}

/// [`cholesky_decompose`] against an explicit episode.
pub fn cholesky_decompose_in<F: MatrixFloat>(
    ep: &mut Episode<F>,
    a: &Var<DMatrix<F>>,
) -> Result<Var<DMatrix<F>>, AdError> {
    cholesky_decompose_with::<F, DefaultKernels>(ep, a)
}

/// [`cholesky_decompose_in`] with an explicit kernel set for the reverse pass.
pub fn cholesky_decompose_with<F, K>(ep: &mut Episode<F>, a: &Var<DMatrix<F>>) -> Result<Var<DMatrix<F>>, AdError>
where
    F: MatrixFloat,
    K: BlockKernels<F> + 'static,
{
    let a_val = a.value().view(ep.arena());
    check_square(FUNCTION, "A", &a_val)?;
    check_no_nan(FUNCTION, "A", ep.arena().slice(a.value().data()))?;
    check_symmetric(FUNCTION, "A", &a_val)?;
    let factor = Cholesky::new(a_val.clone_owned()).ok_or(AdError::NotPositiveDefinite {
        function: FUNCTION,
        name: "A",
    })?;

    let l = Var::new_in(factor.unpack(), ep);
    let a = *a;
    ep.schedule_reverse(FUNCTION, move |ctx| reverse::<F, K>(ctx, &a, &l));
    Ok(l)
}

fn reverse<F, K>(ctx: &mut ChainContext<'_, F>, a: &Var<DMatrix<F>>, l: &Var<DMatrix<F>>) -> Result<(), AdError>
where
    F: MatrixFloat,
    K: BlockKernels<F>,
{
    let n = l.rows();
    let block_size = ctx.tuning().cholesky_rev_block_size(n);
    trace!(rows = n, block_size, kernels = K::NAME, "cholesky_decompose: reverse");

    let arena = ctx.arena_mut();
    let work = ArenaMatrix::try_zeros(n, n, arena)?;
    {
        let (dst, src) = arena.split_mut(work.data(), l.adjoint().data());
        dst.copy_from_slice(src);
    }
    {
        let (adj_buf, l_buf) = arena.split_mut(work.data(), l.value().data());
        let l_val = DMatrixView::from_slice(l_buf, n, n);
        let mut adj = DMatrixViewMut::from_slice(adj_buf, n, n);
        mask_lower(&mut adj);
        blocked_sweep::<F, K>(&l_val, &mut adj, block_size)?;
        mask_lower(&mut adj);
    }
    add_scaled(arena, a.adjoint().data(), F::one(), work.data());
    Ok(())
}

/// Turn the adjoint of `L` (lower triangle of `adj`) into the adjoint of `A`
/// in place.
fn blocked_sweep<F, K>(l: &DMatrixView<'_, F>, adj: &mut DMatrixViewMut<'_, F>, block_size: usize) -> Result<(), AdError>
where
    F: MatrixFloat,
    K: BlockKernels<F>,
{
    let m = l.nrows();
    let half = F::one() / (F::one() + F::one());

    let mut k = m;
    while k > 0 {
        let j = k.saturating_sub(block_size);
        let kj = k - j;
        let mk = m - k;

        let r_val = l.view((j, 0), (kj, j));
        let d_val = l.view((j, j), (kj, kj));
        let b_val = l.view((k, 0), (mk, j));
        let c_val = l.view((k, j), (mk, kj));

        let d_inv = K::tri_inverse(&d_val).ok_or(AdError::Singular { function: FUNCTION })?;
        let mut d_adj = adj.view((j, j), (kj, kj)).clone_owned();

        // Panel below the diagonal block.
        let c_adj = K::matmul(&adj.view((k, j), (mk, kj)), &d_inv);
        adj.view_mut((k, j), (mk, kj)).copy_from(&c_adj);
        let b_corr = K::matmul(&c_adj, &r_val);
        let mut b_adj = adj.view_mut((k, 0), (mk, j));
        b_adj -= &b_corr;
        d_adj -= K::matmul(&c_adj.transpose(), &c_val);

        // Diagonal block: Dinvᵀ · sym(Dᵀ · Dadj) · Dinv.
        d_adj = K::matmul(&d_val.transpose(), &d_adj);
        reflect_lower_to_upper(&mut d_adj);
        let d_inv_t = d_inv.transpose();
        d_adj = K::matmul(&d_inv_t, &K::matmul(&d_inv_t, &d_adj).transpose());
        reflect_lower_to_upper(&mut d_adj);

        // Row panel left of the diagonal block.
        let mut r_corr = K::matmul(&c_adj.transpose(), &b_val);
        r_corr += K::matmul(&d_adj, &r_val);
        let mut r_adj = adj.view_mut((j, 0), (kj, j));
        r_adj -= &r_corr;

        diagonal_multiply(&mut d_adj, half);
        adj.view_mut((j, j), (kj, kj)).copy_from(&d_adj);

        k = j;
    }
    Ok(())
}
