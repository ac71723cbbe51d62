use crate::config::ConfigError;
use crate::io::{CalibrationError, ImageListError, PoseWriteError, ReportError};
use crate::render::RenderError;
use mono_vo_core::BoardError;

/// Fatal errors of a run. Per-frame failures are not errors; they are
/// recorded in the run summary.
#[derive(thiserror::Error, Debug)]
pub enum VoError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    ImageList(#[from] ImageListError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[cfg(feature = "image")]
    #[error(transparent)]
    Detect(#[from] crate::detect::DetectError),

    #[error("render: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    PoseWrite(#[from] PoseWriteError),

    #[error("report: {0}")]
    Report(#[from] ReportError),
}
