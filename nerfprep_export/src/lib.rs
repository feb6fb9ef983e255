//! nerfprep export - Nerfstudio scene exporter
//!
//! Walks a scene of a sensor log in keyframe order and writes a Nerfstudio
//! dataset: `images/`, optional `masks/` and `depth/`, and `transforms.json`.
//!
//! Export runs in two phases. The plan phase resolves every frame's poses,
//! intrinsics and output paths without writing anything; the execute phase
//! produces the artifacts, sequentially or on the rayon pool. The manifest is
//! written only after every frame succeeded.

pub mod config;
pub mod error;
pub mod execute;
pub mod exporter;
pub mod manifest;
pub mod motion;
pub mod plan;
pub mod sink;

pub use config::{ExportConfig, IntrinsicsPolicy, MaskMode};
pub use error::{ExportError, FrameStage, StageError};
pub use exporter::{export_scene, ExportReport};
pub use manifest::{ManifestFrame, TransformsJson, MANIFEST_FILE};
pub use motion::{analyze_scene, rank_scenes, SceneMotion};
pub use plan::{plan_scene, FramePlan, ScenePlan, SceneWalk, WalkState};
pub use sink::{ArtifactSink, FsSink, MemorySink, SinkError};
