//! Core sensor-log trait for nerfprep pipeline stages.

use crate::error::LogError;
use crate::records::{
    AnnotationRecord, CalibratedSensorRecord, EgoPoseRecord, LidarSegRecord, SampleDataRecord,
    SampleRecord, SceneRecord,
};

/// The central read-only interface to a recorded drive.
///
/// Every pipeline stage receives the log explicitly; there is no ambient
/// session. Records are resolved by kind + opaque token, blobs by a path
/// relative to the log's data root.
///
/// # Implementations
///
/// - **Production**: `NuScenesLog` - nuScenes JSON tables on disk
/// - **Synthetic**: `MemoryLog` - records and blobs held in memory
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so that independent frames can be
/// executed in parallel against a shared log.
pub trait SensorLog: Send + Sync {
    /// Resolves a scene record.
    fn scene(&self, token: &str) -> Result<SceneRecord, LogError>;

    /// Resolves a keyframe record.
    fn sample(&self, token: &str) -> Result<SampleRecord, LogError>;

    /// Resolves a sensor capture record.
    fn sample_data(&self, token: &str) -> Result<SampleDataRecord, LogError>;

    /// Resolves an ego pose record.
    fn ego_pose(&self, token: &str) -> Result<EgoPoseRecord, LogError>;

    /// Resolves a sensor calibration record.
    fn calibrated_sensor(&self, token: &str) -> Result<CalibratedSensorRecord, LogError>;

    /// Looks up the semantic label file for a LiDAR capture.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - Labels exist for this capture
    /// * `Ok(None)` - The capture has no segmentation (not an error)
    fn lidarseg(&self, sample_data_token: &str) -> Result<Option<LidarSegRecord>, LogError>;

    /// Returns every box annotation attached to a keyframe.
    ///
    /// An unannotated keyframe yields an empty list.
    fn sample_annotations(&self, sample_token: &str) -> Result<Vec<AnnotationRecord>, LogError>;

    /// Reads a blob (image, point cloud, label file) relative to the data root.
    fn read_blob(&self, relative_path: &str) -> Result<Vec<u8>, LogError>;
}

