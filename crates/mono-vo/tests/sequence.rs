#![cfg(feature = "image")]

mod common;

use approx::assert_abs_diff_eq;
use common::{board, write_sequence};
use mono_vo::io::{read_poses, RunReport};
use mono_vo::{
    CancelPolicy, CancelToken, FrameControl, FrameDecision, RunToEnd, Session, SkipReason,
    VoConfig,
};
use std::path::Path;

fn session(dir: &Path, list: &Path) -> Session {
    Session {
        board: board(),
        image_list: list.to_path_buf(),
        image_scale_factor: 0.5,
        config: VoConfig {
            calibration_path: dir.join("intrinsics.xml"),
            output_path: dir.join("poses.xml"),
            report_path: Some(dir.join("report.json")),
            ..VoConfig::default()
        },
    }
}

/// Quits after the given zero-based frame.
struct QuitAfter(usize);

impl FrameControl for QuitAfter {
    fn after_frame(&mut self, frame_index: usize, _detected: bool) -> FrameDecision {
        if frame_index >= self.0 {
            FrameDecision::Quit
        } else {
            FrameDecision::Continue
        }
    }
}

#[test]
fn frame_without_board_is_skipped() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let (list, truth) = write_sequence(dir.path());

    let out = session(dir.path(), &list).run(&mut RunToEnd).unwrap();
    let records = &out.outcome.records;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].frame_index, 0);
    assert_eq!(records[1].frame_index, 2);
    assert_eq!(out.outcome.summary.skipped.len(), 1);
    assert_eq!(out.outcome.summary.skipped[0].frame_index, 1);
    assert_eq!(out.outcome.summary.skipped[0].reason, SkipReason::BoardNotFound);

    // stored vectors are the negated board pose
    for (rec, t) in records.iter().zip(&truth) {
        let board_pose = rec.pose.sign_inverted();
        assert_abs_diff_eq!(board_pose.tvec, t.translation, epsilon = 2.0);
        assert_abs_diff_eq!(board_pose.rotation(), t.rotation, epsilon = 0.01);
    }

    let written = read_poses(dir.path().join("poses.xml")).unwrap();
    assert_eq!(written.rvecs.len(), 2);
    assert_eq!(written.tvecs.len(), 2);
    assert_abs_diff_eq!(written.tvecs[1], records[1].pose.tvec, epsilon = 1e-9);

    let report = RunReport::load_json(dir.path().join("report.json")).unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.summary.frames_total, 3);
    assert_eq!(report.summary.detected, 2);
    assert_eq!(report.summary.posed, 2);
    assert_eq!(report.records[1].frame_index, 2);
    assert_eq!(report.poses_path, Some(dir.path().join("poses.xml")));
}

#[test]
fn cancelled_run_discards_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let (list, _) = write_sequence(dir.path());

    let out = session(dir.path(), &list).run(&mut QuitAfter(1)).unwrap();
    assert!(out.outcome.is_cancelled());
    assert_eq!(out.outcome.records.len(), 1);
    assert!(out.poses_path.is_none());
    assert!(!dir.path().join("poses.xml").exists());

    let report = RunReport::load_json(dir.path().join("report.json")).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.summary.cancelled_after, Some(1));
}

#[test]
fn cancelled_run_flushes_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let (list, _) = write_sequence(dir.path());

    let mut s = session(dir.path(), &list);
    s.config.cancel_policy = CancelPolicy::Flush;
    s.config.output_path = dir.path().join("poses.json");
    let out = s.run(&mut QuitAfter(1)).unwrap();
    assert_eq!(out.poses_path, Some(dir.path().join("poses.json")));

    let written = read_poses(dir.path().join("poses.json")).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written.frame_indices, vec![0]);
}

#[test]
fn pre_cancelled_token_stops_after_first_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (list, _) = write_sequence(dir.path());

    let token = CancelToken::new();
    token.cancel();
    let mut control = token.clone();
    let out = session(dir.path(), &list).run(&mut control).unwrap();
    assert_eq!(out.outcome.summary.frames_processed, 1);
    assert_eq!(out.outcome.summary.cancelled_after, Some(0));
}

#[test]
fn render_dir_receives_pngs() {
    let dir = tempfile::tempdir().unwrap();
    let (list, _) = write_sequence(dir.path());

    let mut s = session(dir.path(), &list);
    let render = dir.path().join("render");
    s.config.render_dir = Some(render.clone());
    s.run(&mut RunToEnd).unwrap();

    for name in [
        "frame_0000_corners.png",
        "frame_0001_corners.png",
        "frame_0002_corners.png",
        "trajectory.png",
    ] {
        assert!(render.join(name).is_file(), "{name}");
    }
    let panel = image::open(render.join("trajectory.png")).unwrap().to_rgb8();
    assert_eq!(panel.dimensions(), (600, 600));
    assert!(panel.pixels().any(|p| p.0 == [0, 255, 0]));
}

#[test]
fn missing_inputs_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (list, _) = write_sequence(dir.path());

    let mut s = session(dir.path(), &dir.path().join("nope.txt"));
    let err = s.run(&mut RunToEnd).unwrap_err();
    assert!(err.to_string().contains("nope.txt"), "{err}");

    s.image_list = list;
    s.config.calibration_path = dir.path().join("missing.xml");
    let err = s.run(&mut RunToEnd).unwrap_err();
    assert!(matches!(err, mono_vo::VoError::Calibration(_)));
    assert!(!dir.path().join("poses.xml").exists());
}
