//! Export configuration.

use nerfprep_core::{CategoryClassifier, DepthSettings, DynamicClasses};

/// Default dilation kernel for LiDAR masks.
pub const DEFAULT_LIDAR_DILATION: u32 = 8;
/// Default dilation kernel for box masks.
pub const DEFAULT_BBOX_DILATION: u32 = 5;

/// Maximum per-parameter difference (pixels) tolerated by `IntrinsicsPolicy::Verify`.
pub const INTRINSICS_TOLERANCE: f64 = 1e-6;

/// Source of dynamic-object masks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MaskMode {
    /// No masks; frames carry no `mask_path`
    #[default]
    None,

    /// Mask around projected dynamic LiDAR points
    Lidar {
        dynamic_classes: DynamicClasses,
        dilation: u32,
    },

    /// Mask the footprint of dynamic 3D boxes
    BoundingBox {
        classifier: CategoryClassifier,
        dilation: u32,
    },
}

impl MaskMode {
    /// LiDAR masks with the default class set and kernel.
    pub fn lidar() -> Self {
        MaskMode::Lidar {
            dynamic_classes: DynamicClasses::default(),
            dilation: DEFAULT_LIDAR_DILATION,
        }
    }

    /// Box masks with the default classifier and kernel.
    pub fn bounding_box() -> Self {
        MaskMode::BoundingBox {
            classifier: CategoryClassifier::default(),
            dilation: DEFAULT_BBOX_DILATION,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, MaskMode::None)
    }
}

/// How scene-wide intrinsics are established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntrinsicsPolicy {
    /// Take intrinsics from the first frame and trust the rest
    #[default]
    FirstFrame,
    /// Re-read every frame's intrinsics and fail on any change
    Verify,
}

/// Configuration for one scene export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Camera channel exported as frames
    pub camera_channel: String,

    /// LiDAR channel used for masks and depth
    pub lidar_channel: String,

    pub mask: MaskMode,

    /// Depth export; `None` disables it
    pub depth: Option<DepthSettings>,

    pub intrinsics_policy: IntrinsicsPolicy,

    /// Execute frames on the rayon pool
    pub parallel: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            camera_channel: "CAM_FRONT".to_string(),
            lidar_channel: "LIDAR_TOP".to_string(),
            mask: MaskMode::None,
            depth: None,
            intrinsics_policy: IntrinsicsPolicy::FirstFrame,
            parallel: false,
        }
    }
}

impl ExportConfig {
    /// True if frames need LiDAR points.
    pub fn needs_lidar(&self) -> bool {
        matches!(self.mask, MaskMode::Lidar { .. }) || self.depth.is_some()
    }

    /// True if frames need box annotations.
    pub fn needs_annotations(&self) -> bool {
        matches!(self.mask, MaskMode::BoundingBox { .. })
    }
}
