//! Error types for scene export.

use crate::sink::SinkError;
use nerfprep_core::CoreError;
use nerfprep_env::LogError;
use std::fmt;
use thiserror::Error;

/// Per-frame processing stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    PoseResolution,
    ImageCopy,
    PointLoading,
    LabelLoading,
    AnnotationLoading,
    Rasterization,
    ArtifactWrite,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameStage::PoseResolution => "pose resolution",
            FrameStage::ImageCopy => "image copy",
            FrameStage::PointLoading => "point loading",
            FrameStage::LabelLoading => "label loading",
            FrameStage::AnnotationLoading => "annotation loading",
            FrameStage::Rasterization => "rasterization",
            FrameStage::ArtifactWrite => "artifact write",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a frame failure.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors that abort a scene export.
///
/// Any frame failure is fatal for the scene; no manifest is written.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A keyframe has no capture for a required channel
    #[error("Frame {index}: no {channel} capture")]
    FrameDataMissing { index: usize, channel: String },

    /// A stage of a frame failed
    #[error("Frame {index}: {stage} failed: {source}")]
    Frame {
        index: usize,
        stage: FrameStage,
        #[source]
        source: StageError,
    },

    /// Intrinsics differ from the first frame (strict policy only)
    #[error("Frame {index}: camera intrinsics differ from frame 0")]
    IntrinsicsChanged { index: usize },

    /// The scene has no keyframes
    #[error("Scene {0} has no frames")]
    EmptyScene(String),

    /// Scene-level lookup failed before any frame was planned
    #[error("Scene lookup failed: {0}")]
    Scene(#[from] LogError),

    /// Writing the manifest failed
    #[error("Manifest write failed: {0}")]
    Sink(#[from] SinkError),

    /// Serializing the manifest failed
    #[error("Manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Tags a failed result with the frame and stage it came from.
pub trait StageContext<T> {
    fn in_stage(self, index: usize, stage: FrameStage) -> Result<T, ExportError>;
}

impl<T, E: Into<StageError>> StageContext<T> for Result<T, E> {
    fn in_stage(self, index: usize, stage: FrameStage) -> Result<T, ExportError> {
        self.map_err(|source| ExportError::Frame {
            index,
            stage,
            source: source.into(),
        })
    }
}

impl ExportError {
    /// Frame index the error refers to, if any.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            ExportError::FrameDataMissing { index, .. }
            | ExportError::Frame { index, .. }
            | ExportError::IntrinsicsChanged { index } => Some(*index),
            _ => None,
        }
    }

    /// Stage of a frame failure, if any.
    pub fn stage(&self) -> Option<FrameStage> {
        match self {
            ExportError::Frame { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
