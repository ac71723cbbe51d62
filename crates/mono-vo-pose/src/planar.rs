use nalgebra::{Matrix3, Vector3};

/// Decompose a plane-induced homography into `(R, t)`.
///
/// `h` maps board-plane coordinates `(X, Y)` (with `Z = 0`) to normalized
/// camera coordinates, so `h ~ [r1 r2 t]`. The scale sign is chosen to put
/// the board in front of the camera and `R` is projected onto SO(3).
pub fn pose_from_homography(h: &Matrix3<f64>) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm_sum = h1.norm() + h2.norm();
    if !norm_sum.is_finite() || norm_sum < 1e-12 {
        return None;
    }
    let mut lambda = 2.0 / norm_sum;
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = lambda * h1;
    let r2 = lambda * h2;
    let r3 = r1.cross(&r2);
    let r = Matrix3::from_columns(&[r1, r2, r3]);

    // Closest rotation in the Frobenius sense.
    let svd = r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t = lambda * h3;
    if !t.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some((r_orth, t))
}
