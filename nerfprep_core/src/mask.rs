//! Mask Rasterizer: dynamic-object exclusion masks.
//!
//! Output polarity is fixed: `0` excludes a pixel from training, `255`
//! includes it. Evidence is drawn onto a `BinaryCanvas`, dilated with a
//! square kernel and then inverted.

use crate::bbox::BoundingBox3D;
use crate::camera::{CameraIntrinsics, ImageSize};
use crate::error::CoreError;
use crate::pointcloud::ensure_aligned;
use crate::projection::{project, project_box};
use crate::raster::{convex_hull, BinaryCanvas, MaskRaster};
use crate::semantic::{CategoryClassifier, ClassId, DynamicClasses};
use crate::transform::RigidTransform;
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Radius of the disc drawn around each dynamic LiDAR hit, in pixels.
pub const POINT_DISC_RADIUS: i64 = 3;

/// Per-frame quality counters for a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaskDiagnostics {
    /// Dynamic points or dynamic boxes considered
    pub evidence: usize,
    /// Evidence actually drawn
    pub drawn: usize,
    /// Boxes with every corner behind the camera
    pub behind_camera: usize,
    /// Boxes in front of the camera but with no corner in the image
    pub out_of_view: usize,
    /// Boxes filled with their bounding rectangle instead of the hull
    pub hull_fallbacks: usize,
}

impl AddAssign for MaskDiagnostics {
    fn add_assign(&mut self, other: Self) {
        self.evidence += other.evidence;
        self.drawn += other.drawn;
        self.behind_camera += other.behind_camera;
        self.out_of_view += other.out_of_view;
        self.hull_fallbacks += other.hull_fallbacks;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaskOutput {
    pub raster: MaskRaster,
    pub diagnostics: MaskDiagnostics,
}

/// Excludes pixels around projected dynamic LiDAR points.
///
/// # Arguments
/// * `points_world` - LiDAR points in world frame
/// * `labels` - Index-aligned class IDs
/// * `world_to_camera` - Inverse of the OpenCV camera-to-world pose
/// * `intrinsics` - Pinhole parameters
/// * `image_size` - Output raster size
/// * `dynamic_classes` - Classes treated as moving
/// * `dilation` - Square kernel size; `≤ 1` disables dilation
///
/// # Errors
/// `LabelCountMismatch` if `labels` is not index-aligned with `points_world`.
pub fn rasterize_lidar_mask(
    points_world: &[Vector3<f64>],
    labels: &[ClassId],
    world_to_camera: &RigidTransform,
    intrinsics: &CameraIntrinsics,
    image_size: ImageSize,
    dynamic_classes: &DynamicClasses,
    dilation: u32,
) -> Result<MaskOutput, CoreError> {
    ensure_aligned(points_world, labels)?;

    let dynamic_points: Vec<Vector3<f64>> = points_world
        .iter()
        .zip(labels)
        .filter(|(_, &label)| dynamic_classes.contains(label))
        .map(|(p, _)| *p)
        .collect();

    let mut diagnostics = MaskDiagnostics {
        evidence: dynamic_points.len(),
        ..MaskDiagnostics::default()
    };

    let mut canvas = BinaryCanvas::new(image_size);
    let projection = project(&dynamic_points, world_to_camera, intrinsics, image_size);
    for pixel in &projection.pixels {
        canvas.fill_disc(
            pixel.x.round() as i64,
            pixel.y.round() as i64,
            POINT_DISC_RADIUS,
        );
        diagnostics.drawn += 1;
    }

    canvas.dilate(dilation);
    Ok(MaskOutput {
        raster: canvas.into_inclusion_mask(),
        diagnostics,
    })
}

/// Excludes the image footprint of dynamic 3D boxes.
///
/// Each visible dynamic box is filled with the convex hull of its in-image
/// corners. With fewer than three in-image corners, or a hull of zero area,
/// the axis-aligned rectangle around all projected corners is filled
/// instead (clipped to the image).
pub fn rasterize_bbox_mask(
    boxes: &[BoundingBox3D],
    world_to_camera: &RigidTransform,
    intrinsics: &CameraIntrinsics,
    image_size: ImageSize,
    classifier: &CategoryClassifier,
    dilation: u32,
) -> MaskOutput {
    let mut diagnostics = MaskDiagnostics::default();
    let mut canvas = BinaryCanvas::new(image_size);

    for bbox in boxes.iter().filter(|b| classifier.is_dynamic(&b.category)) {
        diagnostics.evidence += 1;

        let projection = project_box(bbox, world_to_camera, intrinsics, image_size);
        let Some(corners) = projection.corners else {
            diagnostics.behind_camera += 1;
            continue;
        };
        if !projection.is_visible {
            diagnostics.out_of_view += 1;
            continue;
        }

        let mut footprint = BinaryCanvas::new(image_size);
        let in_image: Vec<(i64, i64)> = corners
            .iter()
            .filter(|c| image_size.contains(c))
            .map(|c| (c.x.round() as i64, c.y.round() as i64))
            .collect();

        match convex_hull(&in_image) {
            Some(hull) => footprint.fill_convex_polygon(&hull),
            None => {
                diagnostics.hull_fallbacks += 1;
                fill_bounding_rect(&mut footprint, &corners);
            }
        }

        canvas.union(&footprint);
        diagnostics.drawn += 1;
    }

    canvas.dilate(dilation);
    MaskOutput {
        raster: canvas.into_inclusion_mask(),
        diagnostics,
    }
}

fn fill_bounding_rect(canvas: &mut BinaryCanvas, corners: &[Vector2<f64>]) {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in corners {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    canvas.fill_rect(
        min_x.round() as i64,
        min_y.round() as i64,
        max_x.round() as i64,
        max_y.round() as i64,
    );
}
