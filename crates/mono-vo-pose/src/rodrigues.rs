use nalgebra::{Matrix3, Rotation3, Vector3};

/// Rotation vector (axis * angle) to rotation matrix.
pub fn rotation_from_rvec(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*rvec).into_inner()
}

/// Rotation matrix to rotation vector; the input is re-orthonormalized
/// first.
pub fn rvec_from_rotation(r: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix(r).scaled_axis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_vector_is_identity() {
        let r = rotation_from_rvec(&Vector3::zeros());
        assert_abs_diff_eq!(r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_about_z() {
        let r = rotation_from_rvec(&Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let v = r * Vector3::new(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn vector_survives_matrix_round_trip() {
        let rvec = Vector3::new(0.3, -0.2, 0.9);
        let back = rvec_from_rotation(&rotation_from_rvec(&rvec));
        assert_abs_diff_eq!(back, rvec, epsilon = 1e-10);
    }

    #[test]
    fn negated_vector_is_inverse_rotation() {
        let rvec = Vector3::new(0.1, 0.5, -0.4);
        let r = rotation_from_rvec(&rvec);
        let r_neg = rotation_from_rvec(&-rvec);
        assert_abs_diff_eq!(r * r_neg, Matrix3::identity(), epsilon = 1e-12);
    }
}
