//! Argument validation for forward operations.
//!
//! Every check returns `Ok(())` or an [`AdError`] naming the calling function
//! and the offending argument. Checks run before any tape node is scheduled,
//! so a failed check leaves the episode exactly as it was.

use nalgebra::{Cholesky, Dyn, Matrix, Storage};

use crate::error::AdError;
use crate::var::MatrixFloat;
use crate::Float;

/// Absolute tolerance for symmetry and unit-diagonal checks.
pub const CONSTRAINT_TOLERANCE: f64 = 1e-8;

fn tolerance<F: Float>() -> F {
    F::from_f64(CONSTRAINT_TOLERANCE).unwrap_or_else(F::epsilon)
}

/// Reject NaN and infinite elements.
pub fn check_no_nan<F: Float>(function: &'static str, name: &'static str, values: &[F]) -> Result<(), AdError> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(index) => Err(AdError::NonFinite {
            function,
            name,
            index,
            value: values[index].to_f64().unwrap_or(f64::NAN),
        }),
    }
}

pub fn check_square<F, S>(function: &'static str, name: &'static str, m: &Matrix<F, Dyn, Dyn, S>) -> Result<(), AdError>
where
    F: Float,
    S: Storage<F, Dyn, Dyn>,
{
    if m.is_square() {
        Ok(())
    } else {
        Err(AdError::NotSquare {
            function,
            name,
            rows: m.nrows(),
            cols: m.ncols(),
        })
    }
}

pub fn check_size_match(
    function: &'static str,
    name: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), AdError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AdError::ShapeMismatch {
            function,
            name,
            expected,
            actual,
        })
    }
}

/// Square and `|m[i,j] - m[j,i]| <= 1e-8` for every pair.
pub fn check_symmetric<F, S>(function: &'static str, name: &'static str, m: &Matrix<F, Dyn, Dyn, S>) -> Result<(), AdError>
where
    F: Float,
    S: Storage<F, Dyn, Dyn>,
{
    check_square(function, name, m)?;
    let tol = tolerance::<F>();
    let n = m.nrows();
    for col in 1..n {
        for row in 0..col {
            // Negated comparison so NaN fails too.
            if !((m[(row, col)] - m[(col, row)]).abs() <= tol) {
                return Err(AdError::NotSymmetric {
                    function,
                    name,
                    row,
                    col,
                });
            }
        }
    }
    Ok(())
}

/// Symmetric, non-empty, finite, and admits a Cholesky factorization.
pub fn check_pos_definite<F, S>(function: &'static str, name: &'static str, m: &Matrix<F, Dyn, Dyn, S>) -> Result<(), AdError>
where
    F: MatrixFloat,
    S: Storage<F, Dyn, Dyn>,
{
    check_symmetric(function, name, m)?;
    if m.nrows() == 0 {
        return Err(AdError::Domain {
            function,
            name,
            message: "must have at least one row".to_string(),
        });
    }
    let owned = m.clone_owned();
    check_no_nan(function, name, owned.as_slice())?;
    if Cholesky::new(owned).is_none() {
        return Err(AdError::NotPositiveDefinite { function, name });
    }
    Ok(())
}

/// Valid correlation matrix: square, unit diagonal within `1e-8`, positive
/// definite. The empty matrix is accepted.
pub fn check_corr_matrix<F, S>(function: &'static str, name: &'static str, m: &Matrix<F, Dyn, Dyn, S>) -> Result<(), AdError>
where
    F: MatrixFloat,
    S: Storage<F, Dyn, Dyn>,
{
    check_square(function, name, m)?;
    if m.is_empty() {
        return Ok(());
    }
    let tol = tolerance::<F>();
    for k in 0..m.nrows() {
        let d = m[(k, k)];
        if !(num_traits::Float::abs(d - F::one()) <= tol) {
            return Err(AdError::Domain {
                function,
                name,
                message: format!("is not a valid correlation matrix, {name}[{k},{k}] is {d} but should be near 1.0"),
            });
        }
    }
    check_pos_definite(function, name, m)
}

/// [`check_corr_matrix`] applied to each matrix in turn.
pub fn check_corr_matrices<F, S>(
    function: &'static str,
    name: &'static str,
    ms: &[Matrix<F, Dyn, Dyn, S>],
) -> Result<(), AdError>
where
    F: MatrixFloat,
    S: Storage<F, Dyn, Dyn>,
{
    ms.iter().try_for_each(|m| check_corr_matrix(function, name, m))
}

#[cfg(test)]
mod tests {
    use nalgebra::{dmatrix, DMatrix};

    use super::*;

    #[test]
    fn no_nan_reports_first_offender() {
        let err = check_no_nan("f", "x", &[1.0, f64::INFINITY, f64::NAN]).unwrap_err();
        assert!(matches!(err, AdError::NonFinite { index: 1, .. }));
        assert!(check_no_nan("f", "x", &[0.0_f64, -3.5]).is_ok());
    }

    #[test]
    fn symmetry_uses_absolute_tolerance() {
        let ok = dmatrix![1.0, 2.0 + 1e-9; 2.0, 1.0];
        assert!(check_symmetric("f", "m", &ok).is_ok());
        let bad = dmatrix![1.0, 2.0 + 1e-6; 2.0, 1.0];
        assert!(matches!(
            check_symmetric("f", "m", &bad),
            Err(AdError::NotSymmetric { row: 0, col: 1, .. })
        ));
    }

    #[test]
    fn corr_matrix_rules() {
        assert!(check_corr_matrix("f", "c", &DMatrix::<f64>::zeros(0, 0)).is_ok());
        assert!(check_corr_matrix("f", "c", &dmatrix![1.0, 0.3; 0.3, 1.0]).is_ok());
        assert!(matches!(
            check_corr_matrix("f", "c", &dmatrix![1.0, 0.3; 0.3, 1.1]),
            Err(AdError::Domain { .. })
        ));
        assert!(matches!(
            check_corr_matrix("f", "c", &dmatrix![1.0, 2.0; 2.0, 1.0]),
            Err(AdError::NotPositiveDefinite { .. })
        ));
        assert!(matches!(
            check_corr_matrix("f", "c", &DMatrix::<f64>::identity(2, 3)),
            Err(AdError::NotSquare { rows: 2, cols: 3, .. })
        ));
    }

    #[test]
    fn pos_definite_rejects_empty() {
        assert!(matches!(
            check_pos_definite("f", "m", &DMatrix::<f64>::zeros(0, 0)),
            Err(AdError::Domain { .. })
        ));
    }
}
