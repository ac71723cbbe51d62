//! `image`-crate entry points: decoding frames and finding the board at a
//! reduced resolution with the `calib-targets` chessboard detector.

use crate::config::DetectorParams;
use crate::core::{self, BoardSpec, GrayImageView};
use crate::pipeline::{BoardFinder, FrameError, ImageSource};
use ::image::imageops::{self, FilterType};
use calib_targets::chessboard::{ChessboardDetector, ChessboardParams, GridGraphParams};
use calib_targets::detect::detect_corners;
use chess_corners::ChessConfig;
use log::debug;
use nalgebra::Point2;
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("image scale factor must be positive and finite, got {0}")]
    InvalidScale(f64),

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: usize, height: usize },
}

pub fn to_core_gray(img: ::image::GrayImage) -> core::GrayImage {
    core::GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    }
}

pub fn to_image_gray(view: &GrayImageView<'_>) -> Result<::image::GrayImage, DetectError> {
    let bad = || DetectError::InvalidGrayDimensions {
        width: view.width,
        height: view.height,
    };
    let w = u32::try_from(view.width).map_err(|_| bad())?;
    let h = u32::try_from(view.height).map_err(|_| bad())?;
    ::image::GrayImage::from_raw(w, h, view.data.to_vec()).ok_or_else(bad)
}

/// Frames decoded from disk and converted to 8-bit luma.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskImageSource;

impl ImageSource for DiskImageSource {
    fn load(&self, path: &Path) -> Result<core::GrayImage, FrameError> {
        let img = ::image::open(path).map_err(|e| FrameError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(to_core_gray(img.to_luma8()))
    }
}

impl DetectorParams {
    pub fn chess_config(&self) -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.params.threshold_rel = self.threshold_rel as _;
        cfg.params.nms_radius = self.nms_radius as _;
        cfg
    }

    /// Grid assembly settings for the full `board`.
    pub fn chessboard_params(&self, board: &BoardSpec) -> ChessboardParams {
        ChessboardParams {
            min_corner_strength: self.min_corner_strength as _,
            min_corners: board.corner_count() as _,
            expected_rows: Some(board.rows as _),
            expected_cols: Some(board.cols as _),
            completeness_threshold: self.completeness_threshold as _,
            ..ChessboardParams::default()
        }
    }

    pub fn grid_graph_params(&self) -> GridGraphParams {
        GridGraphParams {
            min_spacing_pix: self.min_spacing_pix as _,
            max_spacing_pix: self.max_spacing_pix as _,
            k_neighbors: self.k_neighbors as _,
            orientation_tolerance_deg: self.orientation_tolerance_deg as _,
        }
    }
}

/// Grid transforms `(i, j) -> (column, row)` of a `w x h` grid.
const SYMMETRIES: [fn(i64, i64, i64, i64) -> (i64, i64); 8] = [
    |i, j, _, _| (i, j),
    |i, j, w, h| (w - 1 - i, h - 1 - j),
    |i, j, w, _| (j, w - 1 - i),
    |i, j, _, h| (h - 1 - j, i),
    |i, j, w, _| (w - 1 - i, j),
    |i, j, _, h| (i, h - 1 - j),
    |i, j, _, _| (j, i),
    |i, j, w, h| (h - 1 - j, w - 1 - i),
];

/// Order a labelled grid of exactly `cols x rows` corners row-major.
///
/// Of the labellings that keep the image orientation (columns run
/// clockwise of rows, as on a board seen from its printed side), the one
/// whose first corner is nearest the image's top-left wins. Returns `None`
/// for partial grids, duplicate labels or a size mismatch.
pub fn canonical_order(
    labelled: &[((i64, i64), Point2<f32>)],
    cols: usize,
    rows: usize,
) -> Option<Vec<Point2<f32>>> {
    let min_i = labelled.iter().map(|((i, _), _)| *i).min()?;
    let min_j = labelled.iter().map(|((_, j), _)| *j).min()?;
    let w = labelled.iter().map(|((i, _), _)| i - min_i).max()? + 1;
    let h = labelled.iter().map(|((_, j), _)| j - min_j).max()? + 1;
    let (wu, hu) = (usize::try_from(w).ok()?, usize::try_from(h).ok()?);
    if labelled.len() != cols * rows || wu * hu != cols * rows {
        return None;
    }
    if !((wu, hu) == (cols, rows) || (wu, hu) == (rows, cols)) {
        return None;
    }

    let mut grid: Vec<Option<Point2<f32>>> = vec![None; wu * hu];
    for ((i, j), p) in labelled {
        let slot = &mut grid[((j - min_j) * w + (i - min_i)) as usize];
        if slot.is_some() {
            return None;
        }
        *slot = Some(*p);
    }
    let grid: Vec<Point2<f32>> = grid.into_iter().collect::<Option<_>>()?;

    let (c, r) = (cols as i64, rows as i64);
    let mut best: Option<(f32, Vec<Point2<f32>>)> = None;
    for map in SYMMETRIES {
        let mut ordered = vec![Point2::origin(); cols * rows];
        let mut fits = true;
        for j in 0..h {
            for i in 0..w {
                let (col, row) = map(i, j, w, h);
                if !(0..c).contains(&col) || !(0..r).contains(&row) {
                    fits = false;
                    break;
                }
                ordered[(row * c + col) as usize] = grid[(j * w + i) as usize];
            }
            if !fits {
                break;
            }
        }
        if !fits {
            continue;
        }
        let origin = ordered[0];
        let along = ordered[cols - 1] - origin;
        let across = ordered[(rows - 1) * cols] - origin;
        if along.x * across.y - along.y * across.x <= 0.0 {
            continue;
        }
        let key = origin.x + origin.y;
        if best.as_ref().is_none_or(|(k, _)| key < *k) {
            best = Some((key, ordered));
        }
    }
    best.map(|(_, ordered)| ordered)
}

/// Chessboard detection on a bilinearly resized copy of the frame.
///
/// Corners come back in original-image pixels: detected coordinates are
/// divided by the scale factor.
#[derive(Debug, Clone)]
pub struct ScaledChessboardFinder {
    params: DetectorParams,
    scale: f64,
}

impl ScaledChessboardFinder {
    pub fn new(params: DetectorParams, scale: f64) -> Result<Self, DetectError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(DetectError::InvalidScale(scale));
        }
        Ok(Self { params, scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn resized(&self, img: &GrayImageView<'_>) -> Option<::image::GrayImage> {
        let full = to_image_gray(img).ok()?;
        if self.scale == 1.0 {
            return Some(full);
        }
        let w = (img.width as f64 * self.scale).round().max(1.0) as u32;
        let h = (img.height as f64 * self.scale).round().max(1.0) as u32;
        Some(imageops::resize(&full, w, h, FilterType::Triangle))
    }
}

impl BoardFinder for ScaledChessboardFinder {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img, board), fields(w = img.width, h = img.height, scale = self.scale))
    )]
    fn find(&self, img: &GrayImageView<'_>, board: &BoardSpec) -> Option<Vec<Point2<f64>>> {
        let small = self.resized(img)?;
        let corners = detect_corners(&small, &self.params.chess_config());
        let detector = ChessboardDetector::new(self.params.chessboard_params(board))
            .with_grid_search(self.params.grid_graph_params());
        let Some(result) = detector.detect_from_corners(&corners) else {
            debug!("no board grid among {} corners", corners.len());
            return None;
        };

        let labelled: Vec<((i64, i64), Point2<f32>)> = result
            .detection
            .corners
            .iter()
            .filter_map(|c| c.grid.map(|g| ((g.i as i64, g.j as i64), c.position)))
            .collect();
        let Some(ordered) = canonical_order(&labelled, board.cols as usize, board.rows as usize)
        else {
            debug!(
                "grid of {} corners is not a full {}x{} board",
                labelled.len(),
                board.cols,
                board.rows
            );
            return None;
        };
        Some(
            ordered
                .iter()
                .map(|p| Point2::new(p.x as f64 / self.scale, p.y as f64 / self.scale))
                .collect(),
        )
    }
}
