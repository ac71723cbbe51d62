//! 2D trajectory plot state.
//!
//! Each successful frame maps the board's tracked point through the camera
//! pose into display coordinates; consecutive positions form the segments
//! of the plot.

use mono_vo_core::BoardSpec;
use mono_vo_pose::Pose;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayParams {
    /// Translation scale applied before the origin offset.
    pub scale: f64,
    pub origin: [f64; 3],
    /// Side of the square trajectory panel in pixels.
    pub panel_size: u32,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            scale: 0.3,
            origin: [300.0, 300.0, 300.0],
            panel_size: 600,
        }
    }
}

/// One accumulator update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryStep {
    /// Full display-space position.
    pub position: Vector3<f64>,
    pub from: Point2<i32>,
    pub to: Point2<i32>,
}

#[derive(Debug, Clone)]
pub struct TrajectoryAccumulator {
    centre: Vector3<f64>,
    params: DisplayParams,
    prev: Option<Point2<i32>>,
}

impl TrajectoryAccumulator {
    pub fn new(board: &BoardSpec, params: DisplayParams) -> Self {
        Self {
            centre: board.object_centre().coords,
            params,
            prev: None,
        }
    }

    pub fn params(&self) -> &DisplayParams {
        &self.params
    }

    /// Display position for a camera pose: `R * centre + scale * t + origin`.
    pub fn display_position(&self, camera_pose: &Pose) -> Vector3<f64> {
        camera_pose.rotation() * self.centre
            + self.params.scale * camera_pose.tvec
            + Vector3::from(self.params.origin)
    }

    /// Advance with the next successful frame.
    ///
    /// The first call yields a zero-length segment. Pixel coordinates are
    /// truncated toward zero.
    pub fn update(&mut self, camera_pose: &Pose) -> TrajectoryStep {
        let position = self.display_position(camera_pose);
        let to = Point2::new(position.x as i32, position.y as i32);
        let from = self.prev.unwrap_or(to);
        self.prev = Some(to);
        TrajectoryStep { position, from, to }
    }
}
