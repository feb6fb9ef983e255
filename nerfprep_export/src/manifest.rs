//! Nerfstudio `transforms.json` manifest.

use crate::plan::ScenePlan;
use serde::{Deserialize, Serialize};

/// Manifest file name inside the scene output directory.
pub const MANIFEST_FILE: &str = "transforms.json";

/// Camera model recorded in the manifest.
pub const CAMERA_MODEL: &str = "OPENCV";

/// One frame entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFrame {
    pub file_path: String,

    /// Camera-to-world, OpenGL axes, row-major
    pub transform_matrix: [[f64; 4]; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_file_path: Option<String>,
}

/// The full manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformsJson {
    pub camera_model: String,
    pub w: u32,
    pub h: u32,
    pub fl_x: f64,
    pub fl_y: f64,
    pub cx: f64,
    pub cy: f64,
    pub frames: Vec<ManifestFrame>,
}

impl TransformsJson {
    /// Builds the manifest from a plan, frames in index order.
    pub fn from_plan(plan: &ScenePlan) -> Self {
        let k = &plan.intrinsics;
        Self {
            camera_model: CAMERA_MODEL.to_string(),
            w: k.width,
            h: k.height,
            fl_x: k.fl_x,
            fl_y: k.fl_y,
            cx: k.cx,
            cy: k.cy,
            frames: plan
                .frames
                .iter()
                .map(|frame| ManifestFrame {
                    file_path: frame.image_path.clone(),
                    transform_matrix: frame.transform_matrix.rows(),
                    mask_path: frame.mask_path.clone(),
                    depth_file_path: frame.depth_path.clone(),
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}
