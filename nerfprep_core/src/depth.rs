//! Depth Rasterizer: sparse millimetre depth from static LiDAR returns.

use crate::camera::{CameraIntrinsics, ImageSize};
use crate::error::CoreError;
use crate::pointcloud::ensure_aligned;
use crate::projection::project;
use crate::raster::DepthRaster;
use crate::semantic::{ClassId, DynamicClasses};
use crate::transform::RigidTransform;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Depth filtering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSettings {
    /// Classes whose points are removed before projection
    pub dynamic_classes: DynamicClasses,
    /// Nearest accepted depth in metres (inclusive)
    pub min_depth: f64,
    /// Farthest accepted depth in metres (inclusive)
    pub max_depth: f64,
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            dynamic_classes: DynamicClasses::default(),
            min_depth: 0.1,
            max_depth: 80.0,
        }
    }
}

/// Counters describing one rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepthStats {
    /// Points left after dropping dynamic classes
    pub static_points: usize,
    /// Static points visible in the image and inside the depth range
    pub projected: usize,
    /// Pixels carrying a depth
    pub written: usize,
    /// Pixels whose nearest depth is beyond the u16 millimetre range; left
    /// empty
    pub saturated: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthOutput {
    pub raster: DepthRaster,
    pub stats: DepthStats,
}

/// Metres to the stored millimetre value.
///
/// `None` when the depth does not fit in a u16. Positive depths that round to
/// zero are stored as 1 so they stay distinguishable from "no depth".
pub fn quantize_millimetres(depth: f64) -> Option<u16> {
    let mm = (depth * 1000.0).round();
    if mm > u16::MAX as f64 {
        None
    } else if mm < 1.0 && depth > 0.0 {
        Some(1)
    } else {
        Some(mm.max(0.0) as u16)
    }
}

/// Rasterizes static points into a sparse depth image.
///
/// # Arguments
/// * `points_world` - LiDAR points in world frame
/// * `labels` - Index-aligned class IDs
/// * `world_to_camera` - Inverse of the OpenCV camera-to-world pose
/// * `intrinsics` - Pinhole parameters
/// * `image_size` - Output raster size
/// * `settings` - Dynamic classes and depth range
///
/// When several points land on one pixel the nearest wins, compared in
/// metres before quantization. A winning depth beyond 65.535 m is counted as
/// saturated and the pixel stays 0.
///
/// # Errors
/// `LabelCountMismatch` if `labels` is not index-aligned with `points_world`.
pub fn rasterize_depth(
    points_world: &[Vector3<f64>],
    labels: &[ClassId],
    world_to_camera: &RigidTransform,
    intrinsics: &CameraIntrinsics,
    image_size: ImageSize,
    settings: &DepthSettings,
) -> Result<DepthOutput, CoreError> {
    ensure_aligned(points_world, labels)?;

    let static_points: Vec<Vector3<f64>> = points_world
        .iter()
        .zip(labels)
        .filter(|(_, &label)| !settings.dynamic_classes.contains(label))
        .map(|(p, _)| *p)
        .collect();

    let mut stats = DepthStats {
        static_points: static_points.len(),
        ..DepthStats::default()
    };

    let projection = project(&static_points, world_to_camera, intrinsics, image_size);

    let mut nearest: Vec<Option<f64>> = vec![None; image_size.area()];
    for (pixel, &depth) in projection.pixels.iter().zip(&projection.depths) {
        if depth < settings.min_depth || depth > settings.max_depth {
            continue;
        }
        stats.projected += 1;

        let Some((x, y)) = image_size.nearest_pixel(pixel) else {
            continue;
        };
        let slot = &mut nearest[y as usize * image_size.width as usize + x as usize];
        match slot {
            Some(current) if *current <= depth => {}
            _ => *slot = Some(depth),
        }
    }

    let mut raster = DepthRaster::empty(image_size);
    for (i, depth) in nearest.iter().enumerate() {
        if let Some(depth) = depth {
            let Some(mm) = quantize_millimetres(*depth) else {
                stats.saturated += 1;
                continue;
            };
            let x = (i % image_size.width as usize) as u32;
            let y = (i / image_size.width as usize) as u32;
            raster.set(x, y, mm);
            stats.written += 1;
        }
    }

    Ok(DepthOutput { raster, stats })
}
