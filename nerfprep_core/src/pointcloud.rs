//! LiDAR point cloud loading.
//!
//! Point blobs use the nuScenes `.pcd.bin` layout: little-endian `f32`
//! records of five values (x, y, z, intensity, ring index). Label blobs hold
//! one `u8` class ID per point, in the same order.

use crate::error::CoreError;
use crate::semantic::ClassId;
use nalgebra::Vector3;
use nerfprep_env::{SampleDataRecord, SensorLog};

/// Values per point record in a LiDAR blob.
pub const LIDAR_POINT_DIMS: usize = 5;

const BYTES_PER_POINT: usize = LIDAR_POINT_DIMS * std::mem::size_of::<f32>();

/// Points of one capture in the sensor's local frame, with optional labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    /// Capture token the cloud was loaded from
    pub source: String,

    pub points: Vec<Vector3<f64>>,

    /// Index-aligned class IDs; `None` when the capture has no segmentation
    pub labels: Option<Vec<ClassId>>,
}

/// Checks that `labels` holds exactly one class ID per point.
pub fn ensure_aligned(points: &[Vector3<f64>], labels: &[ClassId]) -> Result<(), CoreError> {
    if labels.len() != points.len() {
        return Err(CoreError::LabelCountMismatch {
            points: points.len(),
            labels: labels.len(),
        });
    }
    Ok(())
}

impl PointCloud {
    /// Builds a cloud, enforcing label alignment.
    pub fn new(
        source: impl Into<String>,
        points: Vec<Vector3<f64>>,
        labels: Option<Vec<ClassId>>,
    ) -> Result<Self, CoreError> {
        if let Some(labels) = &labels {
            ensure_aligned(&points, labels)?;
        }
        Ok(Self {
            source: source.into(),
            points,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    /// Labels for operations that cannot run without them.
    ///
    /// # Errors
    /// `LabelsUnavailable` naming the capture.
    pub fn require_labels(&self) -> Result<&[ClassId], CoreError> {
        self.labels
            .as_deref()
            .ok_or_else(|| CoreError::LabelsUnavailable(self.source.clone()))
    }
}

/// Loads the points (and labels, if any) of one LiDAR capture.
///
/// A capture without a segmentation record loads successfully with
/// `labels = None`.
pub fn load<L: SensorLog + ?Sized>(log: &L, sample_data_token: &str) -> Result<PointCloud, CoreError> {
    let capture = log.sample_data(sample_data_token)?;
    let points = load_points(log, &capture)?;
    let labels = load_labels(log, sample_data_token)?;
    PointCloud::new(sample_data_token, points, labels)
}

/// Reads and decodes the point blob of a resolved capture.
pub fn load_points<L: SensorLog + ?Sized>(
    log: &L,
    capture: &SampleDataRecord,
) -> Result<Vec<Vector3<f64>>, CoreError> {
    let blob = log.read_blob(&capture.filename)?;
    parse_points(&capture.filename, &blob)
}

/// Reads the segmentation labels of a capture, `None` if it has none.
pub fn load_labels<L: SensorLog + ?Sized>(
    log: &L,
    sample_data_token: &str,
) -> Result<Option<Vec<ClassId>>, CoreError> {
    match log.lidarseg(sample_data_token)? {
        Some(record) => Ok(Some(log.read_blob(&record.filename)?)),
        None => Ok(None),
    }
}

/// Decodes a `.pcd.bin` blob into xyz points.
pub fn parse_points(path: &str, blob: &[u8]) -> Result<Vec<Vector3<f64>>, CoreError> {
    if blob.len() % BYTES_PER_POINT != 0 {
        return Err(CoreError::MalformedPointCloud {
            path: path.to_string(),
            len: blob.len(),
            record: BYTES_PER_POINT,
        });
    }

    let points = blob
        .chunks_exact(BYTES_PER_POINT)
        .map(|record| {
            let value = |i: usize| {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&record[i * 4..i * 4 + 4]);
                f32::from_le_bytes(bytes) as f64
            };
            Vector3::new(value(0), value(1), value(2))
        })
        .collect();

    Ok(points)
}

/// Encodes xyz points as a `.pcd.bin` blob (intensity and ring set to 0).
pub fn encode_points(points: &[Vector3<f64>]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(points.len() * BYTES_PER_POINT);
    for p in points {
        for value in [p.x as f32, p.y as f32, p.z as f32, 0.0, 0.0] {
            blob.extend_from_slice(&value.to_le_bytes());
        }
    }
    blob
}
