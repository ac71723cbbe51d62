//! Camera intrinsics persisted by a calibration tool.
//!
//! Two encodings carry the same four fields (`image_width`, `image_height`,
//! `camera_matrix`, `distortion_coefficients`): OpenCV FileStorage XML and
//! JSON. The format follows the file extension; anything other than
//! `.json` is read as XML.

use super::opencv_storage::{StorageDoc, StorageError, StorageWriter};
use mono_vo_pose::{Camera, CameraError, Distortion};
use nalgebra::{DMatrix, Matrix3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("cannot read calibration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("calibration {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: Box<CalibrationError>,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("camera_matrix must be 3x3, got {rows}x{cols}")]
    CameraMatrixShape { rows: usize, cols: usize },
    #[error("distortion_coefficients must be a row or column vector, got {rows}x{cols}")]
    DistortionShape { rows: usize, cols: usize },
    #[error("image size must be positive integers, got {width} x {height}")]
    ImageSize { width: f64, height: f64 },
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// On-disk JSON layout. `camera_matrix` is row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibrationFile {
    image_width: u32,
    image_height: u32,
    camera_matrix: [[f64; 3]; 3],
    distortion_coefficients: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Calibration {
    pub image_width: u32,
    pub image_height: u32,
    pub camera: Camera,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn image_size(width: f64, height: f64) -> Result<(u32, u32), CalibrationError> {
    let ok = |v: f64| v.fract() == 0.0 && v >= 1.0 && v <= u32::MAX as f64;
    if !(ok(width) && ok(height)) {
        return Err(CalibrationError::ImageSize { width, height });
    }
    Ok((width as u32, height as u32))
}

impl Calibration {
    pub fn new(
        image_width: u32,
        image_height: u32,
        camera_matrix: Matrix3<f64>,
        distortion: &[f64],
    ) -> Result<Self, CalibrationError> {
        let camera = Camera::new(camera_matrix, Distortion::from_coeffs(distortion)?)?;
        Ok(Self {
            image_width,
            image_height,
            camera,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = if is_json(path) {
            Self::from_json_str(&raw)
        } else {
            Self::from_xml_str(&raw)
        };
        parsed.map_err(|e| CalibrationError::Invalid {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    pub fn from_xml_str(text: &str) -> Result<Self, CalibrationError> {
        let doc = StorageDoc::parse(text)?;
        let width = doc.read_f64("image_width")?;
        let height = doc.read_f64("image_height")?;
        let (image_width, image_height) = image_size(width, height)?;

        let k = doc.read_matrix("camera_matrix")?;
        if k.shape() != (3, 3) {
            return Err(CalibrationError::CameraMatrixShape {
                rows: k.nrows(),
                cols: k.ncols(),
            });
        }
        let k = Matrix3::from_fn(|r, c| k[(r, c)]);

        let d = doc.read_matrix("distortion_coefficients")?;
        if d.nrows() != 1 && d.ncols() != 1 && !d.is_empty() {
            return Err(CalibrationError::DistortionShape {
                rows: d.nrows(),
                cols: d.ncols(),
            });
        }
        let dist: Vec<f64> = d.iter().copied().collect();

        Self::new(image_width, image_height, k, &dist)
    }

    pub fn from_json_str(text: &str) -> Result<Self, CalibrationError> {
        let file: CalibrationFile = serde_json::from_str(text)?;
        let m = file.camera_matrix;
        let k = Matrix3::from_fn(|r, c| m[r][c]);
        Self::new(
            file.image_width,
            file.image_height,
            k,
            &file.distortion_coefficients,
        )
    }

    /// OpenCV FileStorage XML with the four calibration fields.
    pub fn to_xml_string(&self) -> String {
        let k = self.camera.k();
        let dist = self.camera.distortion.to_coeffs();
        let mut w = StorageWriter::new();
        w.scalar_int("image_width", self.image_width as i64)
            .scalar_int("image_height", self.image_height as i64)
            .matrix("camera_matrix", &DMatrix::from_fn(3, 3, |r, c| k[(r, c)]))
            .matrix(
                "distortion_coefficients",
                &DMatrix::from_column_slice(dist.len(), 1, &dist),
            );
        w.finish()
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let k = self.camera.k();
        let file = CalibrationFile {
            image_width: self.image_width,
            image_height: self.image_height,
            camera_matrix: [
                [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
                [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
                [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
            ],
            distortion_coefficients: self.camera.distortion.to_coeffs(),
        };
        serde_json::to_string_pretty(&file)
    }
}
