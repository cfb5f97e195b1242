use nalgebra::DMatrix;

use crate::episode::Episode;
use crate::error::AdError;
use crate::var::{MatrixFloat, ScalarFloat, Var};

/// Value and gradient of a scalar function `f : Rⁿ → R` by reverse mode.
///
/// ```
/// let (y, g) = revarena::grad(|x: &[revarena::Var<f64>]| Ok(x[0] * x[0] + x[1] * x[1]), &[3.0, 4.0]).unwrap();
/// assert_eq!(y, 25.0);
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn grad<F: ScalarFloat>(
    f: impl FnOnce(&[Var<F>]) -> Result<Var<F>, AdError>,
    x: &[F],
) -> Result<(F, Vec<F>), AdError> {
    let mut episode = Episode::new();
    let inputs: Vec<Var<F>> = x.iter().map(|&v| Var::new_in(v, &mut episode)).collect();

    let output = episode.record(|| f(&inputs))?;
    episode.grad(&output)?;

    let g = inputs.iter().map(|v| episode.adjoint(v)).collect();
    Ok((output.val(), g))
}

/// Value and gradient of a scalar function of one matrix.
///
/// The gradient has the shape of `a`.
pub fn grad_matrix<F: MatrixFloat>(
    f: impl FnOnce(&Var<DMatrix<F>>) -> Result<Var<F>, AdError>,
    a: &DMatrix<F>,
) -> Result<(F, DMatrix<F>), AdError> {
    let mut episode = Episode::new();
    let input = Var::new_in(a.clone(), &mut episode);

    let output = episode.record(|| f(&input))?;
    episode.grad(&output)?;

    Ok((output.val(), episode.adjoint(&input)))
}

/// Values and Jacobian of `f : Rⁿ → Rᵐ`, one reverse pass per output.
///
/// The tape is recorded once; adjoints are zeroed between passes. Row `i`
/// of the Jacobian is the gradient of output `i`.
pub fn jacobian<F: ScalarFloat>(
    f: impl FnOnce(&[Var<F>]) -> Result<Vec<Var<F>>, AdError>,
    x: &[F],
) -> Result<(Vec<F>, Vec<Vec<F>>), AdError> {
    let mut episode = Episode::new();
    let inputs: Vec<Var<F>> = x.iter().map(|&v| Var::new_in(v, &mut episode)).collect();

    let outputs = episode.record(|| f(&inputs))?;

    let mut rows = Vec::with_capacity(outputs.len());
    for output in &outputs {
        episode.set_zero_all_adjoints();
        episode.grad(output)?;
        rows.push(inputs.iter().map(|v| episode.adjoint(v)).collect());
    }

    Ok((outputs.iter().map(Var::val).collect(), rows))
}

/// Vector-Jacobian product `(f(x), wᵀ·J)` in a single reverse pass.
///
/// # Panics
///
/// Panics if `w` and the output of `f` differ in length.
pub fn vjp<F: ScalarFloat>(
    f: impl FnOnce(&[Var<F>]) -> Result<Vec<Var<F>>, AdError>,
    x: &[F],
    w: &[F],
) -> Result<(Vec<F>, Vec<F>), AdError> {
    let mut episode = Episode::new();
    let inputs: Vec<Var<F>> = x.iter().map(|&v| Var::new_in(v, &mut episode)).collect();

    let outputs = episode.record(|| f(&inputs))?;
    assert_eq!(
        outputs.len(),
        w.len(),
        "output length must match weight vector length"
    );

    for (out, &wi) in outputs.iter().zip(w) {
        episode.arena_mut().add_at(out.adjoint(), 0, wi);
    }
    episode.run_reverse_pass()?;

    let values = outputs.iter().map(Var::val).collect();
    let g = inputs.iter().map(|v| episode.adjoint(v)).collect();
    Ok((values, g))
}
