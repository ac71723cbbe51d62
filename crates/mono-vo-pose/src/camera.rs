//! Pinhole camera with rational Brown–Conrady distortion.
//!
//! Coefficient order follows the OpenCV convention
//! `k1 k2 p1 p2 [k3 [k4 k5 k6 [s1 s2 s3 s4 [tx ty]]]]`. Only the first eight
//! are modelled; longer vectors are accepted when the remaining terms are
//! zero.

use nalgebra::{Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Fixed-point iterations used by [`Distortion::undistort`].
const UNDISTORT_ITERS: usize = 20;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera matrix is not invertible")]
    SingularCameraMatrix,
    #[error("camera matrix must have K[2][2] = 1 and zero bottom row, got {0:?}")]
    MalformedCameraMatrix([f64; 3]),
    #[error("unsupported number of distortion coefficients: {0} (expected 0, 4, 5, 8, 12 or 14)")]
    DistortionLength(usize),
    #[error("thin-prism/tilt distortion terms are not supported (coefficient {index} = {value})")]
    UnsupportedDistortionTerm { index: usize, value: f64 },
}

/// Radial (`k1..k6`, rational) and tangential (`p1`, `p2`) distortion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
}

impl Distortion {
    pub fn from_coeffs(coeffs: &[f64]) -> Result<Self, CameraError> {
        if !matches!(coeffs.len(), 0 | 4 | 5 | 8 | 12 | 14) {
            return Err(CameraError::DistortionLength(coeffs.len()));
        }
        if let Some((index, &value)) = coeffs.iter().enumerate().skip(8).find(|(_, v)| **v != 0.0)
        {
            return Err(CameraError::UnsupportedDistortionTerm { index, value });
        }
        let c = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        Ok(Self {
            k1: c(0),
            k2: c(1),
            p1: c(2),
            p2: c(3),
            k3: c(4),
            k4: c(5),
            k5: c(6),
            k6: c(7),
        })
    }

    /// Coefficients in OpenCV order, trimmed to 4, 5 or 8 entries.
    pub fn to_coeffs(&self) -> Vec<f64> {
        let all = [
            self.k1, self.k2, self.p1, self.p2, self.k3, self.k4, self.k5, self.k6,
        ];
        if self.k4 != 0.0 || self.k5 != 0.0 || self.k6 != 0.0 {
            all.to_vec()
        } else if self.k3 != 0.0 {
            all[..5].to_vec()
        } else {
            all[..4].to_vec()
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Apply distortion to normalized image coordinates.
    pub fn distort(&self, p: Point2<f64>) -> Point2<f64> {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = (1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6)
            / (1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6);
        let xy = x * y;
        Point2::new(
            x * radial + 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x),
            y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy,
        )
    }

    /// Invert [`distort`](Self::distort) by fixed-point iteration.
    pub fn undistort(&self, pd: Point2<f64>) -> Point2<f64> {
        if self.is_zero() {
            return pd;
        }
        let (mut x, mut y) = (pd.x, pd.y);
        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;
            let icdist = (1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6)
                / (1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6);
            if !icdist.is_finite() || icdist <= 0.0 {
                return pd;
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (pd.x - dx) * icdist;
            y = (pd.y - dy) * icdist;
        }
        Point2::new(x, y)
    }
}

/// Calibrated camera: intrinsic matrix plus distortion.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    k: Matrix3<f64>,
    k_inv: Matrix3<f64>,
    pub distortion: Distortion,
}

impl Camera {
    pub fn new(k: Matrix3<f64>, distortion: Distortion) -> Result<Self, CameraError> {
        let bottom = [k[(2, 0)], k[(2, 1)], k[(2, 2)]];
        if bottom[0] != 0.0 || bottom[1] != 0.0 || (bottom[2] - 1.0).abs() > 1e-9 {
            return Err(CameraError::MalformedCameraMatrix(bottom));
        }
        let k_inv = k
            .try_inverse()
            .filter(|m| m.iter().all(|v| v.is_finite()))
            .ok_or(CameraError::SingularCameraMatrix)?;
        Ok(Self {
            k,
            k_inv,
            distortion,
        })
    }

    pub fn k(&self) -> &Matrix3<f64> {
        &self.k
    }

    /// Pixel to undistorted normalized coordinates.
    pub fn normalize(&self, pixel: Point2<f64>) -> Point2<f64> {
        let v = self.k_inv * Vector3::new(pixel.x, pixel.y, 1.0);
        self.distortion.undistort(Point2::new(v.x / v.z, v.y / v.z))
    }

    /// Project a camera-frame point to pixels. `None` behind the camera.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= 1e-12 {
            return None;
        }
        let d = self.distortion.distort(Point2::new(p.x / p.z, p.y / p.z));
        let v = self.k * Vector3::new(d.x, d.y, 1.0);
        Some(Point2::new(v.x, v.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn k() -> Matrix3<f64> {
        Matrix3::new(800.0, 0.0, 320.0, 0.0, 790.0, 240.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn accepts_supported_lengths() {
        for n in [0, 4, 5, 8, 12, 14] {
            let coeffs = vec![0.0; n];
            assert!(Distortion::from_coeffs(&coeffs).is_ok(), "len {n}");
        }
        assert_eq!(
            Distortion::from_coeffs(&[0.1, 0.2, 0.3]),
            Err(CameraError::DistortionLength(3))
        );
    }

    #[test]
    fn rejects_nonzero_thin_prism_terms() {
        let mut coeffs = vec![0.0; 12];
        coeffs[9] = 0.01;
        assert!(matches!(
            Distortion::from_coeffs(&coeffs),
            Err(CameraError::UnsupportedDistortionTerm { index: 9, .. })
        ));
    }

    #[test]
    fn undistort_inverts_distort() {
        let d = Distortion::from_coeffs(&[-0.21, 0.08, 0.001, -0.0015, -0.01]).unwrap();
        for &(x, y) in &[(0.0, 0.0), (0.2, -0.1), (-0.35, 0.25), (0.4, 0.3)] {
            let p = Point2::new(x, y);
            let back = d.undistort(d.distort(p));
            assert_abs_diff_eq!(back.x, x, epsilon = 1e-7);
            assert_abs_diff_eq!(back.y, y, epsilon = 1e-7);
        }
    }

    #[test]
    fn project_and_normalize_agree() {
        let d = Distortion::from_coeffs(&[-0.1, 0.02, 0.0, 0.0]).unwrap();
        let cam = Camera::new(k(), d).unwrap();
        let p = Point3::new(30.0, -20.0, 400.0);
        let px = cam.project(&p).unwrap();
        let n = cam.normalize(px);
        assert_abs_diff_eq!(n.x, p.x / p.z, epsilon = 1e-8);
        assert_abs_diff_eq!(n.y, p.y / p.z, epsilon = 1e-8);
        assert!(cam.project(&Point3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn rejects_singular_camera_matrix() {
        let mut bad = k();
        bad[(0, 0)] = 0.0;
        bad[(0, 1)] = 0.0;
        bad[(0, 2)] = 0.0;
        assert_eq!(
            Camera::new(bad, Distortion::default()),
            Err(CameraError::SingularCameraMatrix)
        );
    }

    #[test]
    fn coefficients_trim_to_used_length() {
        let d = Distortion::from_coeffs(&[0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(d.to_coeffs().len(), 4);
        let d = Distortion::from_coeffs(&[0.1, 0.0, 0.0, 0.0, 0.3]).unwrap();
        assert_eq!(d.to_coeffs(), vec![0.1, 0.0, 0.0, 0.0, 0.3]);
    }
}
