//! Record types served by a sensor log.
//!
//! These are the resolved, provider-independent shapes of the nuScenes
//! tables. Empty-string links in the raw tables become `None` here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recorded scene (one continuous drive segment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub token: String,
    pub name: String,
    pub description: String,

    /// First keyframe of the scene's sample chain
    pub first_sample_token: String,

    /// Number of keyframes as recorded by the log (informational)
    pub nbr_samples: usize,
}

/// A keyframe: one synchronized capture instant across all sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub token: String,
    pub scene_token: String,

    /// Capture time in microseconds
    pub timestamp: i64,

    /// Next keyframe in the scene, `None` at the end of the chain
    pub next: Option<String>,

    /// Previous keyframe in the scene, `None` at the start
    pub prev: Option<String>,

    /// Sensor channel (e.g. "CAM_FRONT") -> keyframe sample_data token
    pub data: BTreeMap<String, String>,
}

impl SampleRecord {
    /// Returns the sample_data token captured on `channel` for this keyframe.
    pub fn channel_token(&self, channel: &str) -> Option<&str> {
        self.data.get(channel).map(String::as_str)
    }
}

/// A single sensor capture (camera image or LiDAR sweep).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDataRecord {
    pub token: String,
    pub sample_token: String,
    pub ego_pose_token: String,
    pub calibrated_sensor_token: String,

    /// Blob path relative to the data root
    pub filename: String,

    /// File format tag ("jpg", "pcd", ...)
    pub fileformat: String,

    /// Image width in pixels (0 for non-camera captures)
    pub width: u32,

    /// Image height in pixels (0 for non-camera captures)
    pub height: u32,

    pub timestamp: i64,
    pub is_key_frame: bool,
}

/// Vehicle pose in the world frame at a capture instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgoPoseRecord {
    pub token: String,
    pub translation: [f64; 3],

    /// Quaternion in (w, x, y, z) order
    pub rotation: [f64; 4],

    pub timestamp: i64,
}

/// Sensor mounting relative to the ego (vehicle) frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSensorRecord {
    pub token: String,
    pub sensor_token: String,
    pub translation: [f64; 3],

    /// Quaternion in (w, x, y, z) order
    pub rotation: [f64; 4],

    /// Row-major 3x3 pinhole matrix, present for cameras only
    pub camera_intrinsic: Option<[[f64; 3]; 3]>,
}

/// Per-point semantic label file attached to one LiDAR capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarSegRecord {
    pub token: String,
    pub sample_data_token: String,

    /// Label blob path relative to the data root (one byte per point)
    pub filename: String,
}

/// A 3D box annotation for one object at one keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub token: String,
    pub sample_token: String,

    /// Box center in the world frame
    pub translation: [f64; 3],

    /// Box extent as [width, length, height] in meters
    pub size: [f64; 3],

    /// Quaternion in (w, x, y, z) order
    pub rotation: [f64; 4],

    /// Dot-separated category (e.g. "vehicle.car")
    pub category_name: String,
}
