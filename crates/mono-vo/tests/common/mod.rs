#![allow(dead_code)]

use mono_vo::core::synthetic::{
    facing_rotation, homography_from_pose, render_checkerboard, RenderParams,
};
use mono_vo::core::BoardSpec;
use mono_vo::io::Calibration;
use nalgebra::{Matrix3, Vector3};
use std::fs;
use std::path::{Path, PathBuf};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

pub fn camera_matrix() -> Matrix3<f64> {
    Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0)
}

pub fn board() -> BoardSpec {
    BoardSpec::new(7, 8, 25.4).unwrap()
}

/// Board-to-camera rotation and translation of a frame showing the board.
pub struct TruePose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

pub fn poses() -> Vec<TruePose> {
    [
        ((0.05, -0.1, 0.02), Vector3::new(-80.0, -90.0, 600.0)),
        ((0.12, 0.05, -0.04), Vector3::new(-60.0, -100.0, 620.0)),
        ((-0.08, 0.1, 0.06), Vector3::new(-100.0, -75.0, 580.0)),
    ]
    .into_iter()
    .map(|((a, b, c), translation)| TruePose {
        rotation: facing_rotation(a, b, c),
        translation,
    })
    .collect()
}

fn save_gray(path: &Path, data: Vec<u8>) {
    image::GrayImage::from_raw(WIDTH, HEIGHT, data)
        .unwrap()
        .save(path)
        .unwrap();
}

pub fn write_board_frame(path: &Path, pose: &TruePose) {
    let h = homography_from_pose(&camera_matrix(), &pose.rotation, &pose.translation);
    let img = render_checkerboard(
        &board(),
        &h,
        WIDTH as usize,
        HEIGHT as usize,
        RenderParams::default(),
    )
    .unwrap();
    save_gray(path, img.data);
}

pub fn write_blank_frame(path: &Path) {
    save_gray(path, vec![128; (WIDTH * HEIGHT) as usize]);
}

pub fn write_intrinsics(path: &Path) {
    let cal = Calibration::new(WIDTH, HEIGHT, camera_matrix(), &[]).unwrap();
    fs::write(path, cal.to_xml_string()).unwrap();
}

/// Three frames in `dir`: board, blank, board. Returns the list file and
/// the true poses of frames 0 and 2.
pub fn write_sequence(dir: &Path) -> (PathBuf, Vec<TruePose>) {
    let mut truth = poses();
    truth.remove(1);
    let names = ["f0.png", "f1.png", "f2.png"];
    write_board_frame(&dir.join(names[0]), &truth[0]);
    write_blank_frame(&dir.join(names[1]));
    write_board_frame(&dir.join(names[2]), &truth[1]);
    write_intrinsics(&dir.join("intrinsics.xml"));

    let list = dir.join("images.txt");
    let body: String = names
        .iter()
        .map(|n| format!("{}\n\n", dir.join(n).display()))
        .collect();
    fs::write(&list, body).unwrap();
    (list, truth)
}
