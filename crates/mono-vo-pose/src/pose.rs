use crate::rodrigues::{rotation_from_rvec, rvec_from_rotation};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform as a rotation vector and a translation vector.
///
/// A solver pose maps board coordinates into the camera frame:
/// `p_cam = R(rvec) * p_board + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn from_rotation(rotation: &Matrix3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: rvec_from_rotation(rotation),
            tvec,
        }
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        rotation_from_rvec(&self.rvec)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation() * p.coords + self.tvec)
    }

    /// Both vectors negated.
    ///
    /// This is the component-wise sign flip used to express the camera
    /// relative to the board; it is not the rigid-transform inverse
    /// (`-Rᵀt`).
    pub fn sign_inverted(&self) -> Self {
        Self {
            rvec: -self.rvec,
            tvec: -self.tvec,
        }
    }
}
