//! In-memory sensor log for synthetic scenes and tests.

use crate::error::LogError;
use crate::log::SensorLog;
use crate::records::{
    AnnotationRecord, CalibratedSensorRecord, EgoPoseRecord, LidarSegRecord, SampleDataRecord,
    SampleRecord, SceneRecord,
};
use std::collections::HashMap;

/// Sensor log backed by hash maps.
///
/// Records are inserted directly; blobs are stored as byte vectors keyed by
/// their relative path. Every lookup behaves exactly like the on-disk log,
/// including `RecordNotFound` for unknown tokens.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    scenes: HashMap<String, SceneRecord>,
    samples: HashMap<String, SampleRecord>,
    sample_data: HashMap<String, SampleDataRecord>,
    ego_poses: HashMap<String, EgoPoseRecord>,
    calibrations: HashMap<String, CalibratedSensorRecord>,

    /// Keyed by LiDAR sample_data token
    lidarseg: HashMap<String, LidarSegRecord>,

    /// Keyed by sample token, in insertion order
    annotations: HashMap<String, Vec<AnnotationRecord>>,

    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_scene(&mut self, record: SceneRecord) {
        self.scenes.insert(record.token.clone(), record);
    }

    pub fn insert_sample(&mut self, record: SampleRecord) {
        self.samples.insert(record.token.clone(), record);
    }

    pub fn insert_sample_data(&mut self, record: SampleDataRecord) {
        self.sample_data.insert(record.token.clone(), record);
    }

    pub fn insert_ego_pose(&mut self, record: EgoPoseRecord) {
        self.ego_poses.insert(record.token.clone(), record);
    }

    pub fn insert_calibrated_sensor(&mut self, record: CalibratedSensorRecord) {
        self.calibrations.insert(record.token.clone(), record);
    }

    pub fn insert_lidarseg(&mut self, record: LidarSegRecord) {
        self.lidarseg.insert(record.sample_data_token.clone(), record);
    }

    /// Appends an annotation to its keyframe.
    pub fn insert_annotation(&mut self, record: AnnotationRecord) {
        self.annotations
            .entry(record.sample_token.clone())
            .or_default()
            .push(record);
    }

    /// Stores a blob under a data-root-relative path.
    pub fn insert_blob(&mut self, relative_path: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.insert(relative_path.into(), bytes);
    }

    /// Removes a blob (used to simulate missing files).
    pub fn remove_blob(&mut self, relative_path: &str) -> Option<Vec<u8>> {
        self.blobs.remove(relative_path)
    }

    /// Number of scenes held.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }
}

fn lookup<T: Clone>(
    map: &HashMap<String, T>,
    kind: &'static str,
    token: &str,
) -> Result<T, LogError> {
    map.get(token)
        .cloned()
        .ok_or_else(|| LogError::not_found(kind, token))
}

impl SensorLog for MemoryLog {
    fn scene(&self, token: &str) -> Result<SceneRecord, LogError> {
        lookup(&self.scenes, "scene", token)
    }

    fn sample(&self, token: &str) -> Result<SampleRecord, LogError> {
        lookup(&self.samples, "sample", token)
    }

    fn sample_data(&self, token: &str) -> Result<SampleDataRecord, LogError> {
        lookup(&self.sample_data, "sample_data", token)
    }

    fn ego_pose(&self, token: &str) -> Result<EgoPoseRecord, LogError> {
        lookup(&self.ego_poses, "ego_pose", token)
    }

    fn calibrated_sensor(&self, token: &str) -> Result<CalibratedSensorRecord, LogError> {
        lookup(&self.calibrations, "calibrated_sensor", token)
    }

    fn lidarseg(&self, sample_data_token: &str) -> Result<Option<LidarSegRecord>, LogError> {
        Ok(self.lidarseg.get(sample_data_token).cloned())
    }

    fn sample_annotations(&self, sample_token: &str) -> Result<Vec<AnnotationRecord>, LogError> {
        Ok(self
            .annotations
            .get(sample_token)
            .cloned()
            .unwrap_or_default())
    }

    fn read_blob(&self, relative_path: &str) -> Result<Vec<u8>, LogError> {
        self.blobs.get(relative_path).cloned().ok_or_else(|| {
            LogError::io(
                relative_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "blob not in memory log"),
            )
        })
    }
}
