//! Reductions and elementwise maps over matrix and vector variables.

use nalgebra::{DMatrix, DVector};

use super::elementary::{inv_logit, log_inv_logit as log_inv_logit_value};
use crate::arena::{Arena, ArenaSlice};
use crate::episode::{with_active_episode, Episode};
use crate::error::AdError;
use crate::var::{ScalarFloat, Var};
use crate::Float;

/// `dst += alpha * src` for two distinct allocations of equal length.
pub(crate) fn add_scaled<F: Float>(arena: &mut Arena<F>, dst: ArenaSlice<F>, alpha: F, src: ArenaSlice<F>) {
    let (d, s) = arena.split_mut(dst, src);
    for (d, &s) in d.iter_mut().zip(s.iter()) {
        *d = *d + alpha * s;
    }
}

/// Euclidean norm of a plain slice.
pub fn norm2_value<F: Float>(x: &[F]) -> F {
    x.iter().fold(F::zero(), |acc, &v| acc + v * v).sqrt()
}

/// Sum of all elements.
pub fn sum<F: ScalarFloat>(a: &Var<DMatrix<F>>) -> Var<F> {
    with_active_episode(|ep| sum_in(ep, a))
}

pub fn sum_in<F: ScalarFloat>(ep: &mut Episode<F>, a: &Var<DMatrix<F>>) -> Var<F> {
    let total = ep
        .arena()
        .slice(a.value.data())
        .iter()
        .fold(F::zero(), |acc, &v| acc + v);
    let out = Var::new_in(total, ep);
    let (a_adj, o) = (a.adjoint.data(), out.adjoint);
    ep.schedule_reverse("sum", move |ctx| {
        let arena = ctx.arena_mut();
        let g = arena.get(o, 0);
        for v in arena.slice_mut(a_adj) {
            *v = *v + g;
        }
        Ok(())
    });
    out
}

/// Elementwise `a + b`.
pub fn add<F: ScalarFloat>(a: &Var<DMatrix<F>>, b: &Var<DMatrix<F>>) -> Result<Var<DMatrix<F>>, AdError> {
    with_active_episode(|ep| add_in(ep, a, b))
}

pub fn add_in<F: ScalarFloat>(
    ep: &mut Episode<F>,
    a: &Var<DMatrix<F>>,
    b: &Var<DMatrix<F>>,
) -> Result<Var<DMatrix<F>>, AdError> {
    if a.shape() != b.shape() {
        return Err(AdError::ShapeMismatch {
            function: "add",
            name: "b",
            expected: a.shape(),
            actual: b.shape(),
        });
    }
    let (rows, cols) = a.shape();
    let arena = ep.arena();
    let values: Vec<F> = arena
        .slice(a.value.data())
        .iter()
        .zip(arena.slice(b.value.data()))
        .map(|(&x, &y)| x + y)
        .collect();
    let out = Var::new_in(DMatrix::from_vec(rows, cols, values), ep);
    let (a_adj, b_adj, o) = (a.adjoint.data(), b.adjoint.data(), out.adjoint.data());
    ep.schedule_reverse("add", move |ctx| {
        let arena = ctx.arena_mut();
        add_scaled(arena, a_adj, F::one(), o);
        add_scaled(arena, b_adj, F::one(), o);
        Ok(())
    });
    Ok(out)
}

/// `c * a`.
pub fn scale<F: ScalarFloat>(a: &Var<DMatrix<F>>, c: F) -> Var<DMatrix<F>> {
    with_active_episode(|ep| scale_in(ep, a, c))
}

pub fn scale_in<F: ScalarFloat>(ep: &mut Episode<F>, a: &Var<DMatrix<F>>, c: F) -> Var<DMatrix<F>> {
    let mut value = a.value.to_matrix(ep.arena());
    value.iter_mut().for_each(|v| *v = *v * c);
    let out = Var::new_in(value, ep);
    let (a_adj, o) = (a.adjoint.data(), out.adjoint.data());
    ep.schedule_reverse("scale", move |ctx| {
        add_scaled(ctx.arena_mut(), a_adj, c, o);
        Ok(())
    });
    out
}

/// Elementwise `ln(inv_logit(a))`.
///
/// The local derivative `inv_logit(-a)` is computed in the forward pass and
/// kept in the arena for the reverse closure.
pub fn log_inv_logit<F: ScalarFloat>(a: &Var<DMatrix<F>>) -> Var<DMatrix<F>> {
    with_active_episode(|ep| log_inv_logit_in(ep, a))
}

pub fn log_inv_logit_in<F: ScalarFloat>(ep: &mut Episode<F>, a: &Var<DMatrix<F>>) -> Var<DMatrix<F>> {
    let (rows, cols) = a.shape();
    let x = ep.arena().slice(a.value.data());
    let values: Vec<F> = x.iter().map(|&v| log_inv_logit_value(v)).collect();
    let partials: Vec<F> = x.iter().map(|&v| inv_logit(-v)).collect();
    let partials = ep.arena_mut().alloc_from_slice(&partials);
    let out = Var::new_in(DMatrix::from_vec(rows, cols, values), ep);
    let (a_adj, o) = (a.adjoint.data(), out.adjoint.data());
    ep.schedule_reverse("log_inv_logit", move |ctx| {
        let arena = ctx.arena_mut();
        let contrib: Vec<F> = arena
            .slice(o)
            .iter()
            .zip(arena.slice(partials))
            .map(|(&g, &d)| g * d)
            .collect();
        arena.accumulate(a_adj, &contrib);
        Ok(())
    });
    out
}

/// Euclidean norm of a vector. The reverse rule is `v.adj += out.adj * v / norm`,
/// which is undefined (NaN) at the zero vector.
pub fn norm2<F: ScalarFloat>(v: &Var<DVector<F>>) -> Var<F> {
    with_active_episode(|ep| norm2_in(ep, v))
}

pub fn norm2_in<F: ScalarFloat>(ep: &mut Episode<F>, v: &Var<DVector<F>>) -> Var<F> {
    let norm = norm2_value(ep.arena().slice(v.value.data()));
    let out = Var::new_in(norm, ep);
    let (v_val, v_adj, o) = (v.value.data(), v.adjoint.data(), out.adjoint);
    ep.schedule_reverse("norm2", move |ctx| {
        let arena = ctx.arena_mut();
        let scale = arena.get(o, 0) / norm;
        add_scaled(arena, v_adj, scale, v_val);
        Ok(())
    });
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{dmatrix, dvector};

    use super::*;

    #[test]
    fn sum_spreads_adjoint() {
        let mut ep: Episode<f64> = Episode::new();
        let (a, s) = ep.record(|| {
            let a = Var::new(dmatrix![1.0, 2.0; 3.0, 4.0]);
            (a, sum(&a))
        });
        assert_eq!(s.val(), 10.0);
        ep.grad(&s).unwrap();
        assert_eq!(ep.adjoint(&a), DMatrix::from_element(2, 2, 1.0));
    }

    #[test]
    fn add_rejects_shape_mismatch() {
        let mut ep: Episode<f64> = Episode::new();
        let err = ep
            .record(|| {
                let a = Var::new(DMatrix::<f64>::zeros(2, 3));
                let b = Var::new(DMatrix::<f64>::zeros(3, 2));
                add(&a, &b)
            })
            .unwrap_err();
        assert!(matches!(err, AdError::ShapeMismatch { expected: (2, 3), actual: (3, 2), .. }));
        assert_eq!(ep.tape_len(), 0);
    }

    #[test]
    fn add_of_self_counts_twice() {
        let mut ep: Episode<f64> = Episode::new();
        let (a, s) = ep.record(|| {
            let a = Var::new(dmatrix![1.0, 2.0]);
            let b = add(&a, &a).unwrap();
            (a, sum(&scale(&b, 3.0)))
        });
        ep.grad(&s).unwrap();
        assert_eq!(ep.adjoint(&a), dmatrix![6.0, 6.0]);
    }

    #[test]
    fn norm2_gradient_is_unit_direction() {
        let mut ep: Episode<f64> = Episode::new();
        let (v, n) = ep.record(|| {
            let v = Var::new(dvector![3.0, 4.0]);
            (v, norm2(&v))
        });
        assert_relative_eq!(n.val(), 5.0);
        ep.grad(&n).unwrap();
        let g = ep.adjoint(&v);
        assert_relative_eq!(g[0], 0.6, epsilon = 1e-15);
        assert_relative_eq!(g[1], 0.8, epsilon = 1e-15);
    }
}
