//! Differentiable operations on [`Var`].
//!
//! Every operation computes its result and local partials in the forward
//! pass, creates a fresh output variable and schedules exactly one reverse
//! closure. Operands are never mutated.

pub mod elementary;
pub mod matrix;
mod scalar;

use crate::episode::{with_active_episode, Episode};
use crate::var::{ScalarFloat, Var};

/// `out = value`, with `operand.adj += out.adj * d`.
#[inline]
pub(crate) fn record_unary<F: ScalarFloat>(label: &'static str, operand: Var<F>, value: F, d: F) -> Var<F> {
    with_active_episode(|ep: &mut Episode<F>| {
        let out = Var::new_in(value, ep);
        let (a, o) = (operand.adjoint, out.adjoint);
        ep.schedule_reverse(label, move |ctx| {
            let arena = ctx.arena_mut();
            let g = arena.get(o, 0);
            if g != F::zero() {
                arena.add_at(a, 0, g * d);
            }
            Ok(())
        });
        out
    })
}

/// `out = value`, with `lhs.adj += out.adj * d_lhs` and `rhs.adj += out.adj * d_rhs`.
#[inline]
pub(crate) fn record_binary<F: ScalarFloat>(
    label: &'static str,
    lhs: Var<F>,
    rhs: Var<F>,
    value: F,
    d_lhs: F,
    d_rhs: F,
) -> Var<F> {
    with_active_episode(|ep: &mut Episode<F>| {
        let out = Var::new_in(value, ep);
        let (a, b, o) = (lhs.adjoint, rhs.adjoint, out.adjoint);
        ep.schedule_reverse(label, move |ctx| {
            let arena = ctx.arena_mut();
            let g = arena.get(o, 0);
            if g != F::zero() {
                arena.add_at(a, 0, g * d_lhs);
                arena.add_at(b, 0, g * d_rhs);
            }
            Ok(())
        });
        out
    })
}
