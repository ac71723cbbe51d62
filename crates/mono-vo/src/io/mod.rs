//! File formats: the image list, intrinsics, the poses file and the run report.

pub mod calibration;
pub mod image_list;
pub mod opencv_storage;
pub mod poses;
pub mod report;

pub use calibration::{Calibration, CalibrationError};
pub use image_list::{read_image_list, ImageListError};
pub use opencv_storage::{StorageDoc, StorageError, StorageWriter};
pub use poses::{read_poses, write_poses, PoseFormat, PoseSeries, PoseWriteError};
pub use report::{RunReport, ReportError};
