//! Pose estimation for a planar checkerboard seen by a calibrated camera.
//!
//! - [`Camera`]: intrinsic matrix with rational Brown–Conrady distortion.
//! - [`find_consensus`]: seeded hypothesize-and-verify search.
//! - [`solve_pnp_ransac`]: robust planar PnP returning a [`Pose`];
//!   [`solve_pnp`] fits every correspondence without outlier rejection.
//! - [`refine_pose`]: Levenberg–Marquardt reprojection refinement.
//! - [`rotation_from_rvec`] / [`rvec_from_rotation`]: Rodrigues conversion.

mod camera;
mod planar;
mod pnp;
mod pose;
mod ransac;
mod refine;
mod rodrigues;

pub use camera::{Camera, CameraError, Distortion};
pub use planar::pose_from_homography;
pub use pnp::{solve_pnp, solve_pnp_ransac, PnpError, PnpSolution, MIN_CORRESPONDENCES};
pub use pose::Pose;
pub use ransac::{find_consensus, inlier_set, required_samples, Consensus, RansacOptions};
pub use refine::refine_pose;
pub use rodrigues::{rotation_from_rvec, rvec_from_rotation};
