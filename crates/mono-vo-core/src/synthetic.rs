//! Synthetic checkerboard images with exactly known corner positions.
//!
//! Used by tests and benches across the workspace. A board is rendered
//! through a board-plane to image homography, antialiased by supersampling.

use nalgebra::{Matrix3, Point2, Rotation3, Vector3};

use crate::{blank_frame, BoardSpec, GrayImage, Homography};

/// Supersampling grid per pixel side.
const SUBSAMPLES: usize = 4;

#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    pub dark: u8,
    pub light: u8,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            dark: 20,
            light: 235,
        }
    }
}

/// Homography `K [r1 r2 t]` mapping board-plane coordinates to pixels.
pub fn homography_from_pose(
    k: &Matrix3<f64>,
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
) -> Homography {
    let r1 = rotation.column(0);
    let r2 = rotation.column(1);
    let m = Matrix3::from_columns(&[r1.into_owned(), r2.into_owned(), *translation]);
    Homography::new(k * m)
}

/// Apply `h` to a board-plane point in double precision.
pub fn map_point(h: &Homography, p: Point2<f64>) -> Point2<f64> {
    let v = h.h * Vector3::new(p.x, p.y, 1.0);
    Point2::new(v[0] / v[2], v[1] / v[2])
}

/// Board-to-camera rotation that puts board rows down the image and
/// columns to the right, then tilts it by the given Euler angles.
///
/// The board normal points toward the camera, matching the row-major,
/// left-to-right corner order the detector reports.
pub fn facing_rotation(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let base = Matrix3::new(0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, -1.0);
    Rotation3::from_euler_angles(roll, pitch, yaw).matrix() * base
}

/// Pixel positions of the inner corners in detection order.
///
/// Corner `k` sits at board-plane `(k / cols, k % cols) * square_size`.
pub fn project_corners(board: &BoardSpec, board_to_image: &Homography) -> Vec<Point2<f64>> {
    board
        .object_points()
        .iter()
        .map(|p| map_point(board_to_image, Point2::new(p.x, p.y)))
        .collect()
}

/// Render the board into a `width x height` image.
///
/// Squares cover board-plane `[-s, rows * s] x [-s, cols * s]`; everything
/// else is the light background. Pixel centres sit at integer coordinates.
/// Returns `None` when the homography is singular.
pub fn render_checkerboard(
    board: &BoardSpec,
    board_to_image: &Homography,
    width: usize,
    height: usize,
    params: RenderParams,
) -> Option<GrayImage> {
    let inv = board_to_image.inverse()?;
    let s = board.square_size;
    let x_max = board.rows as f64 * s;
    let y_max = board.cols as f64 * s;

    let mut img = blank_frame(width, height, 0);
    let step = 1.0 / SUBSAMPLES as f64;
    let offset = -0.5 + 0.5 * step;
    let n = (SUBSAMPLES * SUBSAMPLES) as f64;

    for py in 0..height {
        for px in 0..width {
            let mut acc = 0.0;
            for sy in 0..SUBSAMPLES {
                for sx in 0..SUBSAMPLES {
                    let u = px as f64 + offset + sx as f64 * step;
                    let v = py as f64 + offset + sy as f64 * step;
                    let w = inv.h * Vector3::new(u, v, 1.0);
                    let dark = if w[2].abs() < 1e-12 {
                        false
                    } else {
                        let bx = w[0] / w[2];
                        let by = w[1] / w[2];
                        if bx < -s || by < -s || bx >= x_max || by >= y_max {
                            false
                        } else {
                            let cx = (bx / s).floor() as i64;
                            let cy = (by / s).floor() as i64;
                            (cx + cy).rem_euclid(2) == 0
                        }
                    };
                    acc += if dark {
                        params.dark as f64
                    } else {
                        params.light as f64
                    };
                }
            }
            img.data[py * width + px] = (acc / n).round().clamp(0.0, 255.0) as u8;
        }
    }
    Some(img)
}
