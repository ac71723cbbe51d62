//! Where the corner overlay and the trajectory plot go.

use crate::core::GrayImage;
use nalgebra::Point2;

#[cfg(feature = "image")]
use crate::core::BoardSpec;
#[cfg(feature = "image")]
use crate::trajectory::DisplayParams;
#[cfg(feature = "image")]
use ::image::{Rgb, RgbImage};
#[cfg(feature = "image")]
use imageproc::drawing::{
    draw_antialiased_line_segment_mut, draw_cross_mut, draw_filled_circle_mut,
    draw_hollow_circle_mut, draw_line_segment_mut,
};
#[cfg(feature = "image")]
use imageproc::pixelops::interpolate;
#[cfg(feature = "image")]
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

pub trait RenderSink {
    /// Called for every decoded frame; `corners` is `None` when no board was found.
    fn frame(
        &mut self,
        frame_index: usize,
        image: &GrayImage,
        corners: Option<&[Point2<f64>]>,
    ) -> Result<(), RenderError>;

    /// New trajectory segment in panel pixels.
    fn segment(&mut self, from: Point2<i32>, to: Point2<i32>) -> Result<(), RenderError>;

    fn finish(&mut self) -> Result<(), RenderError>;
}

/// Draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn frame(&mut self, _: usize, _: &GrayImage, _: Option<&[Point2<f64>]>) -> Result<(), RenderError> {
        Ok(())
    }

    fn segment(&mut self, _: Point2<i32>, _: Point2<i32>) -> Result<(), RenderError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// One colour per board row, cycling.
#[cfg(feature = "image")]
const ROW_COLORS: [[u8; 3]; 7] = [
    [255, 0, 0],
    [255, 128, 0],
    [200, 200, 0],
    [0, 255, 0],
    [0, 200, 200],
    [0, 0, 255],
    [255, 0, 255],
];

#[cfg(feature = "image")]
const TRAJECTORY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Writes `frame_NNNN_corners.png` per frame and `trajectory.png` at the end.
#[cfg(feature = "image")]
pub struct PngSink {
    dir: PathBuf,
    cols: usize,
    panel: RgbImage,
}

#[cfg(feature = "image")]
impl PngSink {
    pub fn new(
        dir: impl AsRef<Path>,
        board: &BoardSpec,
        display: &DisplayParams,
    ) -> Result<Self, RenderError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let side = display.panel_size.max(1);
        Ok(Self {
            dir,
            cols: board.cols as usize,
            panel: RgbImage::new(side, side),
        })
    }

    pub fn corners_path(&self, frame_index: usize) -> PathBuf {
        self.dir.join(format!("frame_{frame_index:04}_corners.png"))
    }

    pub fn trajectory_path(&self) -> PathBuf {
        self.dir.join("trajectory.png")
    }

    pub fn panel(&self) -> &RgbImage {
        &self.panel
    }
}

/// Rows coloured and chained in detection order, each corner circled.
#[cfg(feature = "image")]
pub fn draw_board_corners(canvas: &mut RgbImage, corners: &[Point2<f64>], cols: usize) {
    let cols = cols.max(1);
    let color_of = |k: usize| Rgb(ROW_COLORS[(k / cols) % ROW_COLORS.len()]);
    for (k, pair) in corners.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        draw_line_segment_mut(
            canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color_of(k + 1),
        );
    }
    for (k, p) in corners.iter().enumerate() {
        let c = (p.x.round() as i32, p.y.round() as i32);
        draw_hollow_circle_mut(canvas, c, 4, color_of(k));
        draw_cross_mut(canvas, color_of(k), c.0, c.1);
    }
}

/// Anti-aliased segment two pixels wide; a zero-length segment is a dot.
#[cfg(feature = "image")]
pub fn draw_thick_segment(canvas: &mut RgbImage, from: Point2<i32>, to: Point2<i32>, color: Rgb<u8>) {
    if from == to {
        draw_filled_circle_mut(canvas, (from.x, from.y), 1, color);
        return;
    }
    let (dx, dy) = ((to.x - from.x).abs(), (to.y - from.y).abs());
    let (ox, oy) = if dx >= dy { (0, 1) } else { (1, 0) };
    for k in 0..2 {
        draw_antialiased_line_segment_mut(
            canvas,
            (from.x + ox * k, from.y + oy * k),
            (to.x + ox * k, to.y + oy * k),
            color,
            interpolate,
        );
    }
}

#[cfg(feature = "image")]
impl RenderSink for PngSink {
    fn frame(
        &mut self,
        frame_index: usize,
        image: &GrayImage,
        corners: Option<&[Point2<f64>]>,
    ) -> Result<(), RenderError> {
        let mut canvas = RgbImage::from_fn(image.width as u32, image.height as u32, |x, y| {
            let v = image.data[y as usize * image.width + x as usize];
            Rgb([v, v, v])
        });
        if let Some(corners) = corners {
            draw_board_corners(&mut canvas, corners, self.cols);
        }
        canvas.save(self.corners_path(frame_index))?;
        Ok(())
    }

    fn segment(&mut self, from: Point2<i32>, to: Point2<i32>) -> Result<(), RenderError> {
        draw_thick_segment(&mut self.panel, from, to, TRAJECTORY_COLOR);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.panel.save(self.trajectory_path())?;
        Ok(())
    }
}
