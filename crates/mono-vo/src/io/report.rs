//! JSON run report.

use crate::pipeline::{PoseRecord, RunSummary};
use mono_vo_core::BoardSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub board: BoardSpec,
    pub image_scale_factor: f64,
    pub calibration_path: PathBuf,
    pub cancelled: bool,
    /// Poses file actually written, if any.
    pub poses_path: Option<PathBuf>,
    pub records: Vec<PoseRecord>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
