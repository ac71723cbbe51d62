//! Monocular camera trajectory from a checkerboard of known size.
//!
//! Each frame of an image sequence is searched for the full board, the
//! board pose is solved with RANSAC PnP against the camera intrinsics, and
//! the sign-inverted pose is appended to the run. A 2D projection of the
//! camera path is accumulated for display, and the rotation/translation
//! vectors are written out at the end.
//!
//! ## Quickstart
//!
//! ```no_run
//! use mono_vo::{RunToEnd, Session, VoConfig};
//! use mono_vo::core::BoardSpec;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session {
//!     board: BoardSpec::new(7, 8, 25.4)?,
//!     image_list: "images.txt".into(),
//!     image_scale_factor: 0.5,
//!     config: VoConfig::default(),
//! };
//! let out = session.run(&mut RunToEnd)?;
//! println!("{} poses", out.outcome.records.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `mono_vo::core`: board geometry, frames, synthetic boards, logging.
//! - `mono_vo::pose`: camera model, RANSAC, planar PnP, LM refinement.
//! - `mono_vo::targets` (feature `image`): the `calib-targets` corner and
//!   grid detectors the board finder runs on.
//! - [`io`]: image list, intrinsics, poses file, run report.
//! - [`pipeline`]: the frame loop and its pluggable stages.
//! - `mono_vo::detect` and [`Session`] (feature `image`): decoding from
//!   disk and the end-to-end run.

#[cfg(feature = "image")]
pub use calib_targets as targets;
pub use mono_vo_core as core;
pub use mono_vo_pose as pose;

pub mod config;
pub mod control;
mod error;
pub mod io;
pub mod pipeline;
pub mod render;
pub mod trajectory;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
mod session;

pub use config::{
    CancelPolicy, ConfigError, DetectorParams, VoConfig, DEFAULT_IMAGE_SCALE_FACTOR, DEFAULT_OBJECT_SIZE,
};
pub use control::{CancelToken, FrameControl, FrameDecision, RunToEnd, StdinStepper};
pub use error::VoError;
pub use pipeline::{
    BoardFinder, FramePipeline, ImageSource, PoseRecord, PoseSolver, RansacPnpSolver, RunOutcome,
    RunSummary, SkipReason, SkippedFrame,
};
pub use render::{NullSink, RenderSink};
pub use trajectory::{DisplayParams, TrajectoryAccumulator};

#[cfg(feature = "image")]
pub use session::{Session, SessionOutput};
