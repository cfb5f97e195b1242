use approx::assert_relative_eq;
use nalgebra::{dmatrix, dvector, DMatrix};
use revarena::ops::matrix;
use revarena::{grad, grad_matrix, jacobian, vjp, Episode, Var};

/// Central finite difference for comparison.
fn finite_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-6;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

fn finite_diff_gradient(f: impl Fn(&[f64]) -> f64, x: &[f64]) -> Vec<f64> {
    let h = 1e-6;
    (0..x.len())
        .map(|i| {
            let mut xp = x.to_vec();
            let mut xm = x.to_vec();
            xp[i] += h;
            xm[i] -= h;
            (f(&xp) - f(&xm)) / (2.0 * h)
        })
        .collect()
}

fn check_elemental(f_var: impl FnOnce(Var<f64>) -> Var<f64>, f_f64: impl Fn(f64) -> f64, x: f64) {
    let (y, g) = grad(|v| Ok(f_var(v[0])), &[x]).unwrap();
    assert_relative_eq!(y, f_f64(x), max_relative = 1e-12);
    assert_relative_eq!(g[0], finite_diff(&f_f64, x), max_relative = 1e-6);
}

fn inv_logit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ── Arithmetic ──

#[test]
fn arithmetic_var_var() {
    let f = |x: &[f64]| (x[0] + x[1]) * (x[0] - x[1]) / (x[1] * x[1] + 1.0);
    let x = [1.3, -0.4];
    let (y, g) = grad(|v| Ok((v[0] + v[1]) * (v[0] - v[1]) / (v[1] * v[1] + 1.0)), &x).unwrap();
    assert_relative_eq!(y, f(&x), max_relative = 1e-12);
    for (a, b) in g.iter().zip(finite_diff_gradient(f, &x)) {
        assert_relative_eq!(*a, b, max_relative = 1e-6);
    }
}

#[test]
fn arithmetic_with_constants() {
    check_elemental(|x| 3.0 - x, |x| 3.0 - x, 0.5);
    check_elemental(|x| 2.0 / x, |x| 2.0 / x, 1.7);
    check_elemental(|x| (x + 1.0) * 4.0 - x / 2.0, |x| (x + 1.0) * 4.0 - x / 2.0, -0.3);
    check_elemental(|x| -x * x, |x| -x * x, 1.1);
}

#[test]
fn compound_assignment() {
    let (_, g) = grad(
        |v| {
            let mut acc = v[0];
            acc *= v[1];
            acc += v[0];
            acc -= 1.0;
            acc /= v[1];
            Ok(acc)
        },
        &[2.0, 3.0],
    )
    .unwrap();
    // (x*y + x - 1) / y  ->  d/dx = (y + 1)/y, d/dy = (1 - x)/y²
    assert_relative_eq!(g[0], 4.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(g[1], -1.0 / 9.0, max_relative = 1e-12);
}

#[test]
fn diamond_pattern_accumulates() {
    // z = x² + x³ shares x across both branches.
    let (_, g) = grad(|v| Ok(v[0] * v[0] + v[0] * v[0] * v[0]), &[2.0]).unwrap();
    assert_relative_eq!(g[0], 16.0, max_relative = 1e-12);
}

// ── Elementary functions ──

#[test]
fn elementary_functions() {
    check_elemental(|x| x.exp(), f64::exp, 0.4);
    check_elemental(|x| x.ln(), f64::ln, 2.5);
    check_elemental(|x| x.sqrt(), f64::sqrt, 3.0);
    check_elemental(|x| x.sin(), f64::sin, 1.2);
    check_elemental(|x| x.cos(), f64::cos, -0.8);
    check_elemental(|x| x.powi(3), |x| x.powi(3), 1.5);
    check_elemental(|x| x.powi(-2), |x| x.powi(-2), 0.9);
    check_elemental(|x| x.powi(0), |x| x.powi(0), 0.9);
}

#[test]
fn logistic_functions() {
    for &x in &[-4.0, -0.5, 0.0, 0.5, 4.0] {
        check_elemental(|v| v.inv_logit(), inv_logit, x);
        check_elemental(|v| v.log_inv_logit(), |x| inv_logit(x).ln(), x);
    }
}

#[test]
fn log_inv_logit_rule_is_inv_logit_of_negation() {
    let (_, g) = grad(|v| Ok(v[0].log_inv_logit()), &[1.3]).unwrap();
    assert_relative_eq!(g[0], inv_logit(-1.3), max_relative = 1e-14);
}

// ── Matrix operations ──

#[test]
fn matrix_log_inv_logit_sum() {
    let a = dmatrix![0.3, -1.2; 2.0, 0.0];
    let (y, g) = grad_matrix(|m| Ok(matrix::sum(&matrix::log_inv_logit(m))), &a).unwrap();
    let expected: f64 = a.iter().map(|&x| inv_logit(x).ln()).sum();
    assert_relative_eq!(y, expected, max_relative = 1e-12);
    for (gi, &ai) in g.iter().zip(a.iter()) {
        assert_relative_eq!(*gi, inv_logit(-ai), max_relative = 1e-12);
    }
}

#[test]
fn matrix_add_and_scale() {
    let mut ep: Episode<f64> = Episode::new();
    let (a, b, s) = ep.record(|| {
        let a = Var::new(dmatrix![1.0, 2.0; 3.0, 4.0]);
        let b = Var::new(dmatrix![0.5, 0.5; 0.5, 0.5]);
        let c = matrix::add(&matrix::scale(&a, 2.0), &b).unwrap();
        (a, b, matrix::sum(&c))
    });
    assert_relative_eq!(s.val(), 2.0 * 10.0 + 2.0);
    ep.grad(&s).unwrap();
    assert_eq!(ep.adjoint(&a), DMatrix::from_element(2, 2, 2.0));
    assert_eq!(ep.adjoint(&b), DMatrix::from_element(2, 2, 1.0));
}

#[test]
fn norm2_matches_finite_differences() {
    let x = [0.3, -1.4, 2.2];
    let f = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>().sqrt();
    let mut ep: Episode<f64> = Episode::new();
    let (v, n) = ep.record(|| {
        let v = Var::new(dvector![x[0], x[1], x[2]]);
        (v, matrix::norm2(&v).exp())
    });
    ep.grad(&n).unwrap();
    let g = ep.adjoint(&v);
    let fd = finite_diff_gradient(|x| f(x).exp(), &x);
    for i in 0..3 {
        assert_relative_eq!(g[i], fd[i], max_relative = 1e-6);
    }
}

// ── Drivers ──

#[test]
fn jacobian_rows_are_independent_gradients() {
    let x = [1.5_f64, -0.5, 2.0];
    let (values, jac) = jacobian(|v| Ok(vec![v[0] * v[1], v[1].sin() + v[2], v[0] * v[2] * v[2]]), &x).unwrap();
    assert_relative_eq!(values[0], -0.75);
    let expected = [
        [x[1], x[0], 0.0],
        [0.0, x[1].cos(), 1.0],
        [x[2] * x[2], 0.0, 2.0 * x[0] * x[2]],
    ];
    for (row, exp) in jac.iter().zip(expected.iter()) {
        for (a, b) in row.iter().zip(exp.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn vjp_is_weighted_jacobian() {
    let x = [1.5, -0.5];
    let w = [2.0, -1.0];
    let (values, g) = vjp(|v| Ok(vec![v[0] * v[1], v[0] + v[1]]), &x, &w).unwrap();
    assert_eq!(values, vec![-0.75, 1.0]);
    assert_relative_eq!(g[0], 2.0 * x[1] - 1.0, epsilon = 1e-12);
    assert_relative_eq!(g[1], 2.0 * x[0] - 1.0, epsilon = 1e-12);
}

#[test]
fn f32_gradients() {
    let (_, g) = grad(|v| Ok(v[0] * v[0].exp()), &[0.5_f32]).unwrap();
    let expected = 0.5_f32.exp() * 1.5;
    assert_relative_eq!(g[0], expected, max_relative = 1e-6);
}
