#![allow(dead_code)]

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revarena::Var;

// ─── Rosenbrock ────────────────────────────────────────────────────────────

pub fn rosenbrock(x: &[Var<f64>]) -> Var<f64> {
    let mut sum = x[0] * 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum = sum + t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

pub fn rosenbrock_f64(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum += t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

// ─── Inputs ────────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}

/// Well-conditioned symmetric positive-definite matrix.
pub fn random_spd(n: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
    &m * m.transpose() + DMatrix::identity(n, n) * n as f64
}
