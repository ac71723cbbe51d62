//! Reprojection-error refinement of a board pose.
//!
//! The pose is parameterized as `[rvec, tvec]` and minimized over the pixel
//! residuals of the given correspondences with the `levenberg-marquardt`
//! solver. The Jacobian is taken by central differences through the full
//! camera model, distortion included.

use crate::camera::Camera;
use crate::pose::Pose;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Point2, Point3, Vector3};

/// Relative step of the finite-difference Jacobian.
const JACOBIAN_STEP: f64 = 1e-6;
const TOLERANCE: f64 = 1e-12;
const PATIENCE: usize = 100;

struct ReprojectionProblem<'a> {
    camera: &'a Camera,
    object: &'a [Point3<f64>],
    pixels: &'a [Point2<f64>],
    params: DVector<f64>,
}

fn params_of(pose: &Pose) -> DVector<f64> {
    DVector::from_column_slice(&[
        pose.rvec.x,
        pose.rvec.y,
        pose.rvec.z,
        pose.tvec.x,
        pose.tvec.y,
        pose.tvec.z,
    ])
}

fn pose_of(params: &DVector<f64>) -> Pose {
    Pose::new(
        Vector3::new(params[0], params[1], params[2]),
        Vector3::new(params[3], params[4], params[5]),
    )
}

impl ReprojectionProblem<'_> {
    fn residuals_at(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        let pose = pose_of(params);
        let mut r = DVector::zeros(2 * self.object.len());
        for (k, (p, px)) in self.object.iter().zip(self.pixels).enumerate() {
            let projected = self.camera.project(&pose.transform_point(p))?;
            r[2 * k] = projected.x - px.x;
            r[2 * k + 1] = projected.y - px.y;
        }
        Some(r)
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for ReprojectionProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.residuals_at(&self.params)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(2 * self.object.len(), self.params.len());
        for c in 0..self.params.len() {
            let h = JACOBIAN_STEP * self.params[c].abs().max(1.0);
            let mut plus = self.params.clone();
            plus[c] += h;
            let mut minus = self.params.clone();
            minus[c] -= h;
            let column = (self.residuals_at(&plus)? - self.residuals_at(&minus)?) / (2.0 * h);
            jac.set_column(c, &column);
        }
        Some(jac)
    }
}

/// Minimize the reprojection error of `initial` over the correspondences.
///
/// Returns the refined pose and its RMS pixel error, or `None` when the
/// residuals cannot be evaluated or the solver does not improve on the
/// starting point.
pub fn refine_pose(
    camera: &Camera,
    object: &[Point3<f64>],
    pixels: &[Point2<f64>],
    initial: &Pose,
) -> Option<(Pose, f64)> {
    if object.len() != pixels.len() || object.len() < 3 {
        return None;
    }
    let problem = ReprojectionProblem {
        camera,
        object,
        pixels,
        params: params_of(initial),
    };
    let start = problem.residuals()?.norm_squared();

    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(TOLERANCE)
        .with_xtol(TOLERANCE)
        .with_gtol(TOLERANCE)
        .with_patience(PATIENCE)
        .minimize(problem);
    let end = problem.residuals()?.norm_squared();
    debug!(
        "lm: {:?} after {} evaluations, cost {:.3e} -> {:.3e}",
        report.termination, report.number_of_evaluations, start, end
    );
    if !end.is_finite() || end > start {
        return None;
    }
    let rms = (end / object.len() as f64).sqrt();
    Some((pose_of(&problem.params), rms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Distortion;
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix3;

    fn camera() -> Camera {
        Camera::new(
            Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0),
            Distortion::from_coeffs(&[-0.15, 0.03, 0.0005, -0.0005, 0.0]).unwrap(),
        )
        .unwrap()
    }

    fn board() -> Vec<Point3<f64>> {
        (0..35)
            .map(|k| Point3::new((k / 7) as f64 * 25.0, (k % 7) as f64 * 25.0, 0.0))
            .collect()
    }

    #[test]
    fn converges_from_a_perturbed_start() {
        let cam = camera();
        let obj = board();
        let truth = Pose::new(Vector3::new(3.0, 0.1, -0.05), Vector3::new(-60.0, -80.0, 550.0));
        let px: Vec<_> = obj
            .iter()
            .map(|p| cam.project(&truth.transform_point(p)).unwrap())
            .collect();

        let start = Pose::new(
            truth.rvec + Vector3::new(0.02, -0.015, 0.01),
            truth.tvec + Vector3::new(4.0, -3.0, 12.0),
        );
        let (pose, rms) = refine_pose(&cam, &obj, &px, &start).unwrap();
        assert!(rms < 1e-6, "rms {rms}");
        assert_abs_diff_eq!(pose.rvec, truth.rvec, epsilon = 1e-7);
        assert_abs_diff_eq!(pose.tvec, truth.tvec, epsilon = 1e-5);
    }

    #[test]
    fn rejects_mismatched_or_tiny_input() {
        let cam = camera();
        let obj = board();
        let start = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 500.0));
        assert!(refine_pose(&cam, &obj, &[], &start).is_none());
        assert!(refine_pose(&cam, &obj[..2], &[Point2::origin(); 2], &start).is_none());
    }

    #[test]
    fn board_behind_the_camera_cannot_be_evaluated() {
        let cam = camera();
        let obj = board();
        let px = vec![Point2::new(320.0, 240.0); obj.len()];
        let behind = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -500.0));
        assert!(refine_pose(&cam, &obj, &px, &behind).is_none());
    }
}
