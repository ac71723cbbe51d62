//! The poses file: camera rotation and translation vectors in success order.
//!
//! XML output is an OpenCV FileStorage document with two sequences, `rvecs`
//! and `tvecs`, of 3x1 double matrices. JSON output carries the same two
//! arrays plus the `frame_index` of each entry.

use super::opencv_storage::{StorageDoc, StorageError, StorageWriter};
use crate::pipeline::PoseRecord;
use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum PoseWriteError {
    #[error("poses file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("poses file holds {rvecs} rvecs but {tvecs} tvecs")]
    Unpaired { rvecs: usize, tvecs: usize },
    #[error("pose entry {index} is not a 3-vector")]
    NotAVector { index: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseFormat {
    Xml,
    Json,
}

impl PoseFormat {
    /// `.json` selects JSON; every other extension is written as XML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Xml,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSeries {
    pub rvecs: Vec<Vector3<f64>>,
    pub tvecs: Vec<Vector3<f64>>,
    #[serde(default)]
    pub frame_indices: Vec<usize>,
}

impl PoseSeries {
    pub fn from_records(records: &[PoseRecord]) -> Self {
        Self {
            rvecs: records.iter().map(|r| r.pose.rvec).collect(),
            tvecs: records.iter().map(|r| r.pose.tvec).collect(),
            frame_indices: records.iter().map(|r| r.frame_index).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rvecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rvecs.is_empty()
    }

    pub fn to_xml_string(&self) -> String {
        let as_mats = |vs: &[Vector3<f64>]| -> Vec<DMatrix<f64>> {
            vs.iter()
                .map(|v| DMatrix::from_column_slice(3, 1, v.as_slice()))
                .collect()
        };
        let mut w = StorageWriter::new();
        w.matrix_seq("rvecs", &as_mats(&self.rvecs))
            .matrix_seq("tvecs", &as_mats(&self.tvecs));
        w.finish()
    }

    pub fn from_xml_str(text: &str) -> Result<Self, PoseWriteError> {
        let doc = StorageDoc::parse(text)?;
        let to_vecs = |mats: Vec<DMatrix<f64>>| -> Result<Vec<Vector3<f64>>, PoseWriteError> {
            mats.iter()
                .enumerate()
                .map(|(index, m)| {
                    if m.len() != 3 {
                        return Err(PoseWriteError::NotAVector { index });
                    }
                    Ok(Vector3::new(m[0], m[1], m[2]))
                })
                .collect()
        };
        let rvecs = to_vecs(doc.read_matrix_seq("rvecs")?)?;
        let tvecs = to_vecs(doc.read_matrix_seq("tvecs")?)?;
        if rvecs.len() != tvecs.len() {
            return Err(PoseWriteError::Unpaired {
                rvecs: rvecs.len(),
                tvecs: tvecs.len(),
            });
        }
        Ok(Self {
            rvecs,
            tvecs,
            frame_indices: Vec::new(),
        })
    }
}

/// Write (overwrite) the poses file in the format chosen by its extension.
pub fn write_poses(path: impl AsRef<Path>, records: &[PoseRecord]) -> Result<(), PoseWriteError> {
    let path = path.as_ref();
    let series = PoseSeries::from_records(records);
    let text = match PoseFormat::from_path(path) {
        PoseFormat::Xml => series.to_xml_string(),
        PoseFormat::Json => serde_json::to_string_pretty(&series)?,
    };
    fs::write(path, text).map_err(|source| PoseWriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_poses(path: impl AsRef<Path>) -> Result<PoseSeries, PoseWriteError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| PoseWriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match PoseFormat::from_path(path) {
        PoseFormat::Xml => PoseSeries::from_xml_str(&raw),
        PoseFormat::Json => Ok(serde_json::from_str(&raw)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mono_vo_pose::Pose;

    fn records() -> Vec<PoseRecord> {
        [(0, 0.1), (2, -0.3)]
            .into_iter()
            .map(|(frame_index, a)| PoseRecord {
                frame_index,
                path: PathBuf::from(format!("frame{frame_index}.png")),
                pose: Pose::new(Vector3::new(a, 0.2, -0.05), Vector3::new(10.0, -20.0, -600.0 + a)),
                display: [300.0, 310.0, 120.0],
            })
            .collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(PoseFormat::from_path(Path::new("out/poses.xml")), PoseFormat::Xml);
        assert_eq!(PoseFormat::from_path(Path::new("poses.JSON")), PoseFormat::Json);
        assert_eq!(PoseFormat::from_path(Path::new("poses")), PoseFormat::Xml);
    }

    #[test]
    fn xml_layout_uses_fixed_field_names() {
        let text = PoseSeries::from_records(&records()).to_xml_string();
        assert!(text.starts_with("<?xml version=\"1.0\"?>\n<opencv_storage>\n<rvecs>\n"));
        assert_eq!(text.matches("<_ type_id=\"opencv-matrix\">").count(), 4);
        assert!(text.contains("<tvecs>"));
        assert!(text.contains("<rows>3</rows>"));
        assert!(text.contains("<cols>1</cols>"));
    }

    #[test]
    fn both_formats_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let recs = records();
        for name in ["poses.xml", "poses.json"] {
            let path = dir.path().join(name);
            write_poses(&path, &recs).unwrap();
            let back = read_poses(&path).unwrap();
            assert_eq!(back.len(), 2);
            assert_eq!(back.rvecs[1], recs[1].pose.rvec);
            assert_eq!(back.tvecs[0], recs[0].pose.tvec);
        }
        let json = read_poses(dir.path().join("poses.json")).unwrap();
        assert_eq!(json.frame_indices, vec![0, 2]);
    }

    #[test]
    fn empty_run_writes_empty_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poses.xml");
        write_poses(&path, &[]).unwrap();
        assert!(read_poses(&path).unwrap().is_empty());
    }

    #[test]
    fn unpaired_sequences_are_rejected() {
        let mut series = PoseSeries::from_records(&records());
        series.tvecs.pop();
        let err = PoseSeries::from_xml_str(&series.to_xml_string()).unwrap_err();
        assert!(matches!(err, PoseWriteError::Unpaired { rvecs: 2, tvecs: 1 }));
    }
}
