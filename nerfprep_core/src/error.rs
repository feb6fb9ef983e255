//! Error types for the projection and rasterization pipeline.

use nerfprep_env::LogError;
use thiserror::Error;

/// Errors raised by the geometric core.
///
/// Degenerate-but-valid inputs (no static points, no dynamic evidence,
/// collinear box corners, boxes behind the camera) are not errors: they
/// produce well-defined rasters instead.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Semantic segmentation is not present for a capture that needs it
    #[error("Semantic labels unavailable for capture {0}")]
    LabelsUnavailable(String),
    
    /// Quaternion cannot be normalized (norm ~ 0)
    #[error("Invalid rotation quaternion {0:?}")]
    InvalidRotation([f64; 4]),
    
    /// A transform that must be rigid could not be inverted
    #[error("Singular transform: matrix is not invertible")]
    SingularTransform,
    
    /// Point blob length is not a whole number of point records
    #[error("Malformed point cloud {path}: {len} bytes is not a multiple of {record} bytes")]
    MalformedPointCloud {
        path: String,
        len: usize,
        record: usize,
    },
    
    /// Label array is not index-aligned with the point array
    #[error("Label count {labels} does not match point count {points}")]
    LabelCountMismatch {
        points: usize,
        labels: usize,
    },
    
    /// A camera calibration record carries no intrinsic matrix
    #[error("Calibration {0} has no camera intrinsic matrix")]
    MissingIntrinsics(String),
    
    /// Underlying sensor-log lookup failed
    #[error(transparent)]
    Log(#[from] LogError),
}
