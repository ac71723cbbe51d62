//! vo-mono-checkerboard: camera trajectory from a checkerboard of known size.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::LevelFilter;
use mono_vo::core::BoardSpec;
use mono_vo::{
    CancelPolicy, FrameControl, RunToEnd, Session, StdinStepper, VoConfig,
    DEFAULT_IMAGE_SCALE_FACTOR, DEFAULT_OBJECT_SIZE,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status for usage errors and interactive quit.
const EXIT_ABORT: u8 = 255;

#[derive(Parser, Debug)]
#[command(name = "vo-mono-checkerboard")]
#[command(
    about = "Estimate a monocular camera trajectory from a checkerboard of known size",
    long_about = "Reads a list of images, finds the board in each, solves the board pose \
                  with RANSAC PnP against the intrinsics file and writes the camera \
                  rotation/translation vectors of every successful frame."
)]
#[command(version)]
struct Cli {
    /// Inner corners per board row.
    board_width: u32,

    /// Inner corner rows.
    board_height: u32,

    /// Text file with one image path per line.
    image_list: PathBuf,

    /// Square side length [default: 25.4].
    object_size: Option<f64>,

    /// Resize factor applied before corner detection [default: 0.5].
    image_scale_factor: Option<f64>,

    /// JSON run configuration; command-line options override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Intrinsics file (OpenCV XML or JSON) [default: intrinsics.xml].
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Poses file; `.json` writes JSON, anything else OpenCV XML [default: poses.xml].
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON run report.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write corner overlays and the trajectory plot as PNG files here.
    #[arg(long)]
    render_dir: Option<PathBuf>,

    /// Pause after every frame: Enter continues, q or ESC quits.
    #[arg(long)]
    step: bool,

    /// Write the poses gathered so far when the run is quit early.
    #[arg(long)]
    flush_on_cancel: bool,

    /// off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Emit logs as JSON lines (requires the `tracing` feature).
    #[arg(long)]
    log_json: bool,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    mono_vo::core::parse_level_filter(s).ok_or_else(|| format!("unknown log level {s:?}"))
}

fn init_logging(level: LevelFilter, json: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        mono_vo::core::init_tracing(json, &level.to_string().to_lowercase());
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = mono_vo::core::init_with_level(level);
        if json {
            log::warn!("--log-json needs the `tracing` feature; using plain logs");
        }
    }
}

fn usage_error(msg: &str) -> ExitCode {
    let mut cmd = Cli::command();
    eprintln!("error: {msg}\n");
    eprintln!("{}", cmd.render_usage());
    ExitCode::from(EXIT_ABORT)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_ABORT);
        }
    };

    let object_size = cli.object_size.unwrap_or(DEFAULT_OBJECT_SIZE);
    let board = match BoardSpec::new(cli.board_width, cli.board_height, object_size) {
        Ok(board) => board,
        Err(e) => return usage_error(&e.to_string()),
    };
    let scale = cli.image_scale_factor.unwrap_or(DEFAULT_IMAGE_SCALE_FACTOR);
    if !(scale.is_finite() && scale > 0.0) {
        return usage_error(&format!(
            "image scale factor must be positive and finite, got {scale}"
        ));
    }

    init_logging(cli.log_level, cli.log_json);

    let mut config = match &cli.config {
        Some(path) => match VoConfig::load_json(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: cannot load config {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => VoConfig::default(),
    };
    if let Some(path) = cli.calibration {
        config.calibration_path = path;
    }
    if let Some(path) = cli.output {
        config.output_path = path;
    }
    if cli.report.is_some() {
        config.report_path = cli.report;
    }
    if cli.render_dir.is_some() {
        config.render_dir = cli.render_dir;
    }
    if cli.flush_on_cancel {
        config.cancel_policy = CancelPolicy::Flush;
    }

    let session = Session {
        board,
        image_list: cli.image_list,
        image_scale_factor: scale,
        config,
    };
    let mut control: Box<dyn FrameControl> = if cli.step {
        Box::new(StdinStepper::stdin())
    } else {
        Box::new(RunToEnd)
    };

    match session.run(control.as_mut()) {
        Ok(out) if out.outcome.is_cancelled() => ExitCode::from(EXIT_ABORT),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_positionals_default() {
        let cli = Cli::try_parse_from(["vo-mono-checkerboard", "7", "8", "list.txt"]).unwrap();
        assert_eq!((cli.board_width, cli.board_height), (7, 8));
        assert_eq!(cli.object_size.unwrap_or(DEFAULT_OBJECT_SIZE), 25.4);
        assert_eq!(
            cli.image_scale_factor.unwrap_or(DEFAULT_IMAGE_SCALE_FACTOR),
            0.5
        );
        assert_eq!(cli.log_level, LevelFilter::Info);
        assert!(!cli.step);
    }

    #[test]
    fn all_positionals_parse() {
        let cli = Cli::try_parse_from(["vo", "9", "6", "l.txt", "30", "0.25", "--step"]).unwrap();
        assert_eq!(cli.object_size, Some(30.0));
        assert_eq!(cli.image_scale_factor, Some(0.25));
        assert!(cli.step);
    }

    #[test]
    fn positional_count_is_checked() {
        assert!(Cli::try_parse_from(["vo", "7", "8"]).is_err());
        assert!(Cli::try_parse_from(["vo", "7", "8", "l", "1", "2", "3"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
