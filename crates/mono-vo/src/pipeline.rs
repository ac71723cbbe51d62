//! The per-frame loop.
//!
//! For every listed frame: decode, find the board, solve its pose, flip the
//! pose to camera-relative, advance the trajectory and draw. The frame
//! control is consulted after every frame whatever its outcome.

use crate::control::{FrameControl, FrameDecision};
use crate::core::{frame_view, BoardSpec, GrayImage, GrayImageView};
use crate::render::RenderSink;
use crate::trajectory::{DisplayParams, TrajectoryAccumulator};
use log::{debug, info, warn};
use mono_vo_pose::{solve_pnp, solve_pnp_ransac, Camera, PnpError, Pose, RansacOptions};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone)]
pub enum FrameError {
    #[error("cannot read image {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

pub trait ImageSource {
    fn load(&self, path: &Path) -> Result<GrayImage, FrameError>;
}

pub trait BoardFinder {
    /// Inner corners in row-major order and original-image pixels, or
    /// `None` when the full board is not visible.
    fn find(&self, img: &GrayImageView<'_>, board: &BoardSpec) -> Option<Vec<Point2<f64>>>;
}

pub trait PoseSolver {
    /// Board-to-camera pose.
    fn solve(
        &self,
        object: &[Point3<f64>],
        image: &[Point2<f64>],
        camera: &Camera,
    ) -> Result<Pose, PnpError>;
}

/// Planar PnP inside RANSAC.
///
/// When no hypothesis gathers enough inliers the pose is fitted to every
/// corner instead, so a detected board still gets a pose.
#[derive(Debug, Clone, Default)]
pub struct RansacPnpSolver {
    pub options: RansacOptions,
}

impl RansacPnpSolver {
    pub fn new(options: RansacOptions) -> Self {
        Self { options }
    }
}

impl PoseSolver for RansacPnpSolver {
    fn solve(
        &self,
        object: &[Point3<f64>],
        image: &[Point2<f64>],
        camera: &Camera,
    ) -> Result<Pose, PnpError> {
        let sol = match solve_pnp_ransac(object, image, camera, &self.options) {
            Err(PnpError::NoConsensus) => {
                warn!("no RANSAC consensus, fitting all {} corners", object.len());
                solve_pnp(object, image, camera, self.options.refine)?
            }
            other => other?,
        };
        debug!(
            "pose inliers {}/{} rms {:.3} px",
            sol.inliers.len(),
            object.len(),
            sol.rms
        );
        Ok(sol.pose)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    ImageUnreadable(String),
    BoardNotFound,
    PoseFailed(String),
}

impl SkipReason {
    /// Whether the board was found before the frame was given up.
    pub fn board_detected(&self) -> bool {
        matches!(self, Self::PoseFailed(_))
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageUnreadable(msg) => write!(f, "image unreadable: {msg}"),
            Self::BoardNotFound => write!(f, "board not found"),
            Self::PoseFailed(msg) => write!(f, "pose failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFrame {
    pub frame_index: usize,
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// One successful frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// Zero-based position in the image list.
    pub frame_index: usize,
    pub path: PathBuf,
    /// Camera relative to the board: the solver's vectors, negated.
    #[serde(flatten)]
    pub pose: Pose,
    /// Trajectory display position.
    pub display: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub frames_total: usize,
    pub frames_processed: usize,
    /// Frames where the full board was found.
    pub detected: usize,
    /// Detected frames that also got a pose.
    pub posed: usize,
    pub skipped: Vec<SkippedFrame>,
    /// Frame after which the run was stopped.
    pub cancelled_after: Option<usize>,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            "{} frames listed, {} processed, {} detected, {} posed, {} skipped",
            self.frames_total,
            self.frames_processed,
            self.detected,
            self.posed,
            self.skipped.len()
        );
        for s in &self.skipped {
            info!("  frame {} ({}): {}", s.frame_index, s.path.display(), s.reason);
        }
        if let Some(i) = self.cancelled_after {
            info!("run cancelled after frame {i}");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Successful frames in processing order.
    pub records: Vec<PoseRecord>,
    pub summary: RunSummary,
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.summary.cancelled_after.is_some()
    }
}

pub struct FramePipeline<'a> {
    pub board: BoardSpec,
    pub camera: &'a Camera,
    /// Calibrated image size; frames of another size are processed with a warning.
    pub expected_size: Option<(u32, u32)>,
    pub source: &'a dyn ImageSource,
    pub finder: &'a dyn BoardFinder,
    pub solver: &'a dyn PoseSolver,
    pub display: DisplayParams,
}

impl FramePipeline<'_> {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(frames = frames.len()))
    )]
    pub fn run(
        &self,
        frames: &[PathBuf],
        control: &mut dyn FrameControl,
        sink: &mut dyn RenderSink,
    ) -> RunOutcome {
        let object = self.board.object_points();
        let mut trajectory = TrajectoryAccumulator::new(&self.board, self.display.clone());
        let mut out = RunOutcome {
            summary: RunSummary {
                frames_total: frames.len(),
                ..RunSummary::default()
            },
            ..RunOutcome::default()
        };
        let mut size_warned = false;

        for (frame_index, path) in frames.iter().enumerate() {
            out.summary.frames_processed += 1;
            let result = self.process_frame(
                frame_index,
                path,
                &object,
                &mut trajectory,
                sink,
                &mut size_warned,
            );
            let detected = match result {
                Ok(record) => {
                    out.records.push(record);
                    out.summary.detected += 1;
                    out.summary.posed += 1;
                    true
                }
                Err(reason) => {
                    warn!("frame {frame_index} ({}): {reason}", path.display());
                    let detected = reason.board_detected();
                    if detected {
                        out.summary.detected += 1;
                    }
                    out.summary.skipped.push(SkippedFrame {
                        frame_index,
                        path: path.clone(),
                        reason,
                    });
                    detected
                }
            };

            if control.after_frame(frame_index, detected) == FrameDecision::Quit {
                info!("quit requested after frame {frame_index}");
                out.summary.cancelled_after = Some(frame_index);
                break;
            }
        }

        if let Err(e) = sink.finish() {
            warn!("render sink: {e}");
        }
        out
    }

    fn process_frame(
        &self,
        frame_index: usize,
        path: &Path,
        object: &[Point3<f64>],
        trajectory: &mut TrajectoryAccumulator,
        sink: &mut dyn RenderSink,
        size_warned: &mut bool,
    ) -> Result<PoseRecord, SkipReason> {
        let img = self
            .source
            .load(path)
            .map_err(|e| SkipReason::ImageUnreadable(e.to_string()))?;

        if let Some((w, h)) = self.expected_size {
            if !*size_warned && (img.width != w as usize || img.height != h as usize) {
                warn!(
                    "frame {frame_index} is {}x{}, calibration is {w}x{h}",
                    img.width, img.height
                );
                *size_warned = true;
            }
        }

        let corners = self
            .finder
            .find(&frame_view(&img), &self.board)
            .filter(|c| c.len() == object.len());
        if let Err(e) = sink.frame(frame_index, &img, corners.as_deref()) {
            warn!("render sink: {e}");
        }
        let corners = corners.ok_or(SkipReason::BoardNotFound)?;

        let board_pose = self
            .solver
            .solve(object, &corners, self.camera)
            .map_err(|e| SkipReason::PoseFailed(e.to_string()))?;
        let pose = board_pose.sign_inverted();

        let step = trajectory.update(&pose);
        if let Err(e) = sink.segment(step.from, step.to) {
            warn!("render sink: {e}");
        }

        info!("frame {frame_index}: {} corners, pose solved", corners.len());
        debug!(
            "frame {frame_index}: rvec [{:.5} {:.5} {:.5}] tvec [{:.3} {:.3} {:.3}] display ({}, {})",
            pose.rvec.x,
            pose.rvec.y,
            pose.rvec.z,
            pose.tvec.x,
            pose.tvec.y,
            pose.tvec.z,
            step.to.x,
            step.to.y
        );

        Ok(PoseRecord {
            frame_index,
            path: path.to_path_buf(),
            pose,
            display: [step.position.x, step.position.y, step.position.z],
        })
    }
}
