use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("board needs at least 2x2 inner corners, got {cols}x{rows}")]
    TooSmall { cols: u32, rows: u32 },
    #[error("square size must be positive and finite, got {0}")]
    BadSquareSize(f64),
}

/// Physical description of a checkerboard by its inner corners.
///
/// `cols` is the number of inner corners per row (board width), `rows` the
/// number of rows (board height). `square_size` is in caller units,
/// typically millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    pub cols: u32,
    pub rows: u32,
    pub square_size: f64,
}

impl BoardSpec {
    pub fn new(cols: u32, rows: u32, square_size: f64) -> Result<Self, BoardError> {
        if cols < 2 || rows < 2 {
            return Err(BoardError::TooSmall { cols, rows });
        }
        if !(square_size.is_finite() && square_size > 0.0) {
            return Err(BoardError::BadSquareSize(square_size));
        }
        Ok(Self {
            cols,
            rows,
            square_size,
        })
    }

    pub fn corner_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Board-frame 3D points, one per inner corner, in detection order.
    ///
    /// Point `k` is `(k / cols, k % cols, 0) * square_size`, so the first
    /// coordinate counts rows and the second walks along a row.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let cols = self.cols as usize;
        (0..self.corner_count())
            .map(|k| {
                Point3::new(
                    (k / cols) as f64 * self.square_size,
                    (k % cols) as f64 * self.square_size,
                    0.0,
                )
            })
            .collect()
    }

    /// Point tracked by the trajectory display.
    ///
    /// `(cols - 1) / 2` and `(rows - 1) / 2` are integer divisions, so for
    /// even corner counts this is half a square off the true centre.
    pub fn object_centre(&self) -> Point3<f64> {
        let half_w = (self.cols.saturating_sub(1) / 2) as f64;
        let half_h = (self.rows.saturating_sub(1) / 2) as f64;
        Point3::new(half_w * self.square_size, half_h * self.square_size, 0.0)
    }
}
