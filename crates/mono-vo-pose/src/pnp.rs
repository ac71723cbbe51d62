//! Pose of a planar target from 3D-2D correspondences.
//!
//! A hypothesis is the DLT homography (`calib-targets-core`) from board
//! points to undistorted normalized image points, decomposed into `(R, t)`.
//! [`solve_pnp_ransac`] draws hypotheses from four correspondences and
//! scores them by pixel reprojection through the full camera model;
//! [`solve_pnp`] fits all correspondences at once. Both finish with a
//! Levenberg–Marquardt polish unless disabled.

use crate::camera::Camera;
use crate::planar::pose_from_homography;
use crate::pose::Pose;
use crate::ransac::{find_consensus, inlier_set, RansacOptions};
use crate::refine::refine_pose;
use calib_targets_core::estimate_homography_rect_to_img;
use log::debug;
use nalgebra::{Point2, Point3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Correspondences in a minimal sample.
pub const MIN_CORRESPONDENCES: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PnpError {
    #[error("object/image point count mismatch: {object} vs {image}")]
    LengthMismatch { object: usize, image: usize },
    #[error("need at least 4 correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("object point {index} is off the z = 0 plane (z = {z})")]
    NonPlanar { index: usize, z: f64 },
    #[error("object points do not span the board plane")]
    Degenerate,
    #[error("RANSAC found no pose with enough inliers")]
    NoConsensus,
}

#[derive(Debug, Clone)]
pub struct PnpSolution {
    /// Board to camera.
    pub pose: Pose,
    pub inliers: Vec<usize>,
    /// RMS pixel reprojection error over the inliers.
    pub rms: f64,
    /// Whether the Levenberg–Marquardt polish was applied.
    pub refined: bool,
}

fn check_input(object: &[Point3<f64>], image: &[Point2<f64>]) -> Result<(), PnpError> {
    if object.len() != image.len() {
        return Err(PnpError::LengthMismatch {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < MIN_CORRESPONDENCES {
        return Err(PnpError::NotEnoughPoints(object.len()));
    }
    if let Some((index, p)) = object.iter().enumerate().find(|(_, p)| p.z.abs() > 1e-9) {
        return Err(PnpError::NonPlanar { index, z: p.z });
    }
    Ok(())
}

/// True when some three of the indexed board points are not collinear.
fn spans_plane(object: &[Point3<f64>], idx: &[usize]) -> bool {
    let Some(&first) = idx.first() else {
        return false;
    };
    let a = object[first].xy();
    let Some(b) = idx
        .iter()
        .map(|&i| object[i].xy())
        .max_by(|p, q| (p - a).norm_squared().total_cmp(&(q - a).norm_squared()))
    else {
        return false;
    };
    let ab = b - a;
    let scale = ab.norm_squared();
    if scale <= 1e-18 {
        return false;
    }
    idx.iter().any(|&i| {
        let ac = object[i].xy() - a;
        (ab.x * ac.y - ab.y * ac.x).abs() > 1e-9 * scale.max(ac.norm_squared())
    })
}

/// Pose through the homography fitted to the indexed correspondences.
fn plane_pose(object: &[Point3<f64>], normalized: &[Point2<f64>], idx: &[usize]) -> Option<Pose> {
    let board: Vec<Point2<f32>> = idx
        .iter()
        .map(|&i| Point2::new(object[i].x as f32, object[i].y as f32))
        .collect();
    let camera: Vec<Point2<f32>> = idx
        .iter()
        .map(|&i| Point2::new(normalized[i].x as f32, normalized[i].y as f32))
        .collect();
    let h = estimate_homography_rect_to_img(&board, &camera)?;
    let (r, t) = pose_from_homography(&h.h)?;
    Some(Pose::from_rotation(&r, t))
}

fn reprojection_error(camera: &Camera, object: &Point3<f64>, pixel: &Point2<f64>, pose: &Pose) -> f64 {
    camera
        .project(&pose.transform_point(object))
        .map_or(f64::INFINITY, |px| (px - pixel).norm())
}

fn polish(
    camera: &Camera,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    idx: &[usize],
    pose: Pose,
) -> (Pose, bool) {
    let obj: Vec<Point3<f64>> = idx.iter().map(|&i| object[i]).collect();
    let px: Vec<Point2<f64>> = idx.iter().map(|&i| image[i]).collect();
    match refine_pose(camera, &obj, &px, &pose) {
        Some((refined, _)) => (refined, true),
        None => (pose, false),
    }
}

/// Solve for the board-to-camera pose with RANSAC.
///
/// `object` must lie on `z = 0`; `image` holds observed (distorted) pixel
/// positions in the same order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(object, image, camera, opts), fields(points = object.len()))
)]
pub fn solve_pnp_ransac(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &Camera,
    opts: &RansacOptions,
) -> Result<PnpSolution, PnpError> {
    check_input(object, image)?;
    let normalized: Vec<Point2<f64>> = image.iter().map(|&px| camera.normalize(px)).collect();
    let residual = |pose: &Pose, i: usize| reprojection_error(camera, &object[i], &image[i], pose);

    let consensus = find_consensus(
        object.len(),
        MIN_CORRESPONDENCES,
        opts,
        |sample| {
            if spans_plane(object, sample) {
                plane_pose(object, &normalized, sample)
            } else {
                None
            }
        },
        residual,
    )
    .ok_or(PnpError::NoConsensus)?;

    let mut pose = consensus.hypothesis;
    let mut inliers = consensus.inliers;
    if let Some(refit) = plane_pose(object, &normalized, &inliers) {
        let (refit_inliers, _) = inlier_set(&refit, object.len(), opts.thresh, residual);
        if refit_inliers.len() >= inliers.len() {
            pose = refit;
            inliers = refit_inliers;
        }
    }

    let mut refined = false;
    if opts.refine {
        let (polished, ok) = polish(camera, object, image, &inliers, pose);
        let (polished_inliers, _) = inlier_set(&polished, object.len(), opts.thresh, residual);
        if ok && polished_inliers.len() >= inliers.len() {
            pose = polished;
            refined = true;
        }
    }

    let (inliers, rms) = inlier_set(&pose, object.len(), opts.thresh, residual);
    debug!(
        "pnp: {}/{} inliers, rms {:.4} px after {} samples{}",
        inliers.len(),
        object.len(),
        rms,
        consensus.samples_drawn,
        if refined { ", refined" } else { "" }
    );
    Ok(PnpSolution {
        pose,
        inliers,
        rms,
        refined,
    })
}

/// Solve for the board-to-camera pose from all correspondences, without
/// outlier rejection.
pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &Camera,
    refine: bool,
) -> Result<PnpSolution, PnpError> {
    check_input(object, image)?;
    let all: Vec<usize> = (0..object.len()).collect();
    if !spans_plane(object, &all) {
        return Err(PnpError::Degenerate);
    }
    let normalized: Vec<Point2<f64>> = image.iter().map(|&px| camera.normalize(px)).collect();
    let mut pose = plane_pose(object, &normalized, &all).ok_or(PnpError::Degenerate)?;

    let mut refined = false;
    if refine {
        (pose, refined) = polish(camera, object, image, &all, pose);
    }
    let (_, rms) = inlier_set(&pose, object.len(), f64::INFINITY, |p: &Pose, i: usize| {
        reprojection_error(camera, &object[i], &image[i], p)
    });
    Ok(PnpSolution {
        pose,
        inliers: all,
        rms,
        refined,
    })
}
