//! nerfprep Sensor-Log Abstraction Layer
//!
//! This crate provides the read-only data-provider interface that every
//! nerfprep pipeline stage receives explicitly, replacing an ambient
//! database session.
//!
//! # Core Concept: Resolve by Kind + Token
//!
//! A sensor log exposes its tables as typed lookups (`scene`, `sample`,
//! `sample_data`, `ego_pose`, `calibrated_sensor`, `lidarseg`, annotations)
//! keyed by opaque tokens, plus blob reads relative to a data root.
//!
//! # Example
//!
//! ```ignore
//! use nerfprep_env::{NuScenesLog, SensorLog};
//!
//! let log = NuScenesLog::open("data/raw", "v1.0-mini")?;
//! let scene = log.scene_at(0).unwrap();
//! let first = log.sample(&scene.first_sample_token)?;
//! let camera = log.sample_data(first.channel_token("CAM_FRONT").unwrap())?;
//! ```

mod error;
mod log;
mod memory;
mod nuscenes;
mod records;

pub use error::LogError;
pub use log::SensorLog;
pub use memory::MemoryLog;
pub use nuscenes::NuScenesLog;
pub use records::{
    AnnotationRecord, CalibratedSensorRecord, EgoPoseRecord, LidarSegRecord, SampleDataRecord,
    SampleRecord, SceneRecord,
};
