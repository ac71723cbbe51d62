//! Core types and utilities for checkerboard-based visual odometry.
//!
//! Board geometry and the logger live here. Gray images and homographies
//! are the `calib-targets-core` types, re-exported so downstream crates
//! share one definition with the detector.

mod board;
mod frame;
mod logger;
pub mod synthetic;

pub use board::{BoardError, BoardSpec};
pub use calib_targets_core::{GrayImage, GrayImageView, Homography};
pub use frame::{blank_frame, frame_view, pixel};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level_filter};
