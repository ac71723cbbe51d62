//! Run configuration, loadable from JSON. Every field has a default.

use crate::trajectory::DisplayParams;
use mono_vo_pose::RansacOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OBJECT_SIZE: f64 = 25.4;
pub const DEFAULT_IMAGE_SCALE_FACTOR: f64 = 0.5;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Corner detector and grid assembly settings.
///
/// The first two tune ChESS corner detection; the rest tune how corners are
/// linked into the board grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Response threshold relative to the strongest corner.
    pub threshold_rel: f32,
    pub nms_radius: u32,
    pub min_corner_strength: f32,
    /// Fraction of the board's corners a grid must contain.
    pub completeness_threshold: f32,
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    pub k_neighbors: usize,
    pub orientation_tolerance_deg: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 2,
            min_corner_strength: 0.5,
            completeness_threshold: 0.9,
            min_spacing_pix: 10.0,
            max_spacing_pix: 120.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}

/// What to do with gathered poses when a run is cancelled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelPolicy {
    /// Write nothing.
    #[default]
    Discard,
    /// Write the poses gathered so far.
    Flush,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoConfig {
    pub calibration_path: PathBuf,
    pub output_path: PathBuf,
    pub report_path: Option<PathBuf>,
    /// Directory for corner and trajectory PNGs; nothing is drawn when unset.
    pub render_dir: Option<PathBuf>,
    pub cancel_policy: CancelPolicy,
    pub detector: DetectorParams,
    pub ransac: RansacOptions,
    pub display: DisplayParams,
}

impl Default for VoConfig {
    fn default() -> Self {
        Self {
            calibration_path: PathBuf::from("intrinsics.xml"),
            output_path: PathBuf::from("poses.xml"),
            report_path: None,
            render_dir: None,
            cancel_policy: CancelPolicy::Discard,
            detector: DetectorParams::default(),
            ransac: RansacOptions::default(),
            display: DisplayParams::default(),
        }
    }
}

impl VoConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: VoConfig = serde_json::from_str(
            r#"{ "output_path": "out.json", "cancel_policy": "flush",
                 "ransac": { "thresh": 2.0 }, "display": { "scale": 0.5 },
                 "detector": { "nms_radius": 3 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.output_path, PathBuf::from("out.json"));
        assert_eq!(cfg.calibration_path, PathBuf::from("intrinsics.xml"));
        assert_eq!(cfg.cancel_policy, CancelPolicy::Flush);
        assert_eq!(cfg.ransac.thresh, 2.0);
        assert_eq!(cfg.ransac.max_iters, RansacOptions::default().max_iters);
        assert_eq!(cfg.display.scale, 0.5);
        assert_eq!(cfg.display.panel_size, 600);
        assert_eq!(cfg.detector.nms_radius, 3);
        assert_eq!(cfg.detector.threshold_rel, 0.2);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vo.json");
        let cfg = VoConfig {
            render_dir: Some(PathBuf::from("render")),
            ..VoConfig::default()
        };
        cfg.write_json(&path).unwrap();
        let back = VoConfig::load_json(&path).unwrap();
        assert_eq!(back.render_dir, cfg.render_dir);
        assert_eq!(back.cancel_policy, CancelPolicy::Discard);
    }
}
