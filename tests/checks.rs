use nalgebra::{dmatrix, DMatrix};
use revarena::check::{
    check_corr_matrices, check_corr_matrix, check_no_nan, check_pos_definite, check_size_match, check_square,
    check_symmetric, CONSTRAINT_TOLERANCE,
};
use revarena::{AdError, ErrorKind};

#[test]
fn corr_matrix_accepts_unit_diagonal_within_tolerance() {
    let c = dmatrix![
        1.0 + 0.5 * CONSTRAINT_TOLERANCE, 0.2, 0.1;
        0.2, 1.0, -0.3;
        0.1, -0.3, 1.0 - 0.5 * CONSTRAINT_TOLERANCE
    ];
    assert!(check_corr_matrix("fit", "Omega", &c).is_ok());
}

#[test]
fn corr_matrix_reports_the_diagonal_entry() {
    let c = dmatrix![1.0, 0.0; 0.0, 1.001];
    let err = check_corr_matrix("fit", "Omega", &c).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputValidation);
    let msg = err.to_string();
    assert!(msg.starts_with("fit: Omega"), "{msg}");
    assert!(msg.contains("Omega[1,1]"), "{msg}");
    assert!(msg.contains("near 1.0"), "{msg}");
}

#[test]
fn corr_matrix_on_views() {
    let big = dmatrix![
        9.0, 9.0, 9.0;
        9.0, 1.0, 0.5;
        9.0, 0.5, 1.0
    ];
    let view = big.view((1, 1), (2, 2));
    assert!(check_corr_matrix("fit", "Omega", &view).is_ok());
}

#[test]
fn corr_matrices_stop_at_first_failure() {
    let good = DMatrix::<f64>::identity(3, 3);
    let bad = dmatrix![1.0, 1.5; 1.5, 1.0];
    assert!(check_corr_matrices("fit", "Omega", &[good.clone(), good.clone()]).is_ok());
    assert!(matches!(
        check_corr_matrices("fit", "Omega", &[good, bad]),
        Err(AdError::NotPositiveDefinite { .. })
    ));
}

#[test]
fn pos_definite_rejects_nan_on_the_diagonal() {
    let m = dmatrix![f64::NAN, 0.0; 0.0, 1.0];
    assert!(matches!(
        check_pos_definite("f", "S", &m),
        Err(AdError::NonFinite { index: 0, .. })
    ));
}

#[test]
fn symmetric_rejects_nan_off_diagonal() {
    let m = dmatrix![1.0, f64::NAN; f64::NAN, 1.0];
    assert!(matches!(
        check_symmetric("f", "S", &m),
        Err(AdError::NotSymmetric { .. })
    ));
}

#[test]
fn size_and_shape_checks() {
    assert!(check_size_match("f", "b", (2, 3), (2, 3)).is_ok());
    let err = check_size_match("f", "b", (2, 3), (3, 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    assert_eq!(err.to_string(), "f: b has shape (3, 2), expected (2, 3)");

    assert!(check_square("f", "m", &DMatrix::<f32>::zeros(4, 4)).is_ok());
    assert!(check_square("f", "m", &DMatrix::<f32>::zeros(4, 1)).is_err());
}

#[test]
fn no_nan_accepts_empty_and_reports_value() {
    assert!(check_no_nan::<f64>("f", "x", &[]).is_ok());
    match check_no_nan("f", "x", &[0.0_f32, f32::NEG_INFINITY]) {
        Err(AdError::NonFinite { index, value, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(value, f64::NEG_INFINITY);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
