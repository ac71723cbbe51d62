//! A complete run: inputs from disk, the frame loop, outputs to disk.

use crate::config::{CancelPolicy, VoConfig};
use crate::control::FrameControl;
use crate::core::BoardSpec;
use crate::detect::{DiskImageSource, ScaledChessboardFinder};
use crate::error::VoError;
use crate::io::{read_image_list, write_poses, Calibration, RunReport};
use crate::pipeline::{FramePipeline, RansacPnpSolver, RunOutcome};
use crate::render::{NullSink, PngSink, RenderSink};
use log::info;
use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct Session {
    pub board: BoardSpec,
    pub image_list: PathBuf,
    /// Resize factor applied before corner detection.
    pub image_scale_factor: f64,
    pub config: VoConfig,
}

#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub outcome: RunOutcome,
    /// Poses file written, `None` when a cancelled run was discarded.
    pub poses_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

impl Session {
    /// Fails only on fatal errors: unreadable list or calibration, bad
    /// parameters, output that cannot be written.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(board = ?(self.board.cols, self.board.rows)))
    )]
    pub fn run(&self, control: &mut dyn FrameControl) -> Result<SessionOutput, VoError> {
        let cfg = &self.config;
        let frames = read_image_list(&self.image_list)?;
        info!(
            "{} frames listed in {}",
            frames.len(),
            self.image_list.display()
        );

        let calibration = Calibration::load(&cfg.calibration_path)?;
        info!(
            "calibration {}: {}x{}",
            cfg.calibration_path.display(),
            calibration.image_width,
            calibration.image_height
        );

        let finder = ScaledChessboardFinder::new(cfg.detector.clone(), self.image_scale_factor)?;
        let solver = RansacPnpSolver::new(cfg.ransac.clone());
        let mut sink: Box<dyn RenderSink> = match &cfg.render_dir {
            Some(dir) => Box::new(PngSink::new(dir, &self.board, &cfg.display)?),
            None => Box::new(NullSink),
        };

        let pipeline = FramePipeline {
            board: self.board,
            camera: &calibration.camera,
            expected_size: Some((calibration.image_width, calibration.image_height)),
            source: &DiskImageSource,
            finder: &finder,
            solver: &solver,
            display: cfg.display.clone(),
        };
        let outcome = pipeline.run(&frames, control, sink.as_mut());
        outcome.summary.log();

        let keep = !outcome.is_cancelled() || cfg.cancel_policy == CancelPolicy::Flush;
        let poses_path = if keep {
            write_poses(&cfg.output_path, &outcome.records)?;
            info!(
                "wrote {} poses to {}",
                outcome.records.len(),
                cfg.output_path.display()
            );
            Some(cfg.output_path.clone())
        } else {
            info!("cancelled, discarding {} poses", outcome.records.len());
            None
        };

        if let Some(path) = &cfg.report_path {
            let report = RunReport {
                board: self.board,
                image_scale_factor: self.image_scale_factor,
                calibration_path: cfg.calibration_path.clone(),
                cancelled: outcome.is_cancelled(),
                poses_path: poses_path.clone(),
                records: outcome.records.clone(),
                summary: outcome.summary.clone(),
            };
            report.write_json(path)?;
            info!("report written to {}", path.display());
        }

        Ok(SessionOutput {
            outcome,
            poses_path,
            report_path: cfg.report_path.clone(),
        })
    }
}
