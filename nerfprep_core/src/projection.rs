//! Projection Engine: world geometry into camera pixels.
//!
//! Camera space uses OpenCV axes (x right, y down, z forward). A point is
//! visible when it lies strictly in front of the camera (`z > 0`) and its
//! continuous pixel coordinate falls in `[0,w) x [0,h)`.

use crate::bbox::BoundingBox3D;
use crate::camera::{CameraIntrinsics, ImageSize};
use crate::error::CoreError;
use crate::transform::RigidTransform;
use nalgebra::{Vector2, Vector3};
use nerfprep_env::{CalibratedSensorRecord, EgoPoseRecord};

/// Result of projecting a point set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    /// Pixel coordinates of the visible points, in input order
    pub pixels: Vec<Vector2<f64>>,
    /// Camera-space depth (z, metres) of the visible points
    pub depths: Vec<f64>,
    /// One flag per input point
    pub visible: Vec<bool>,
}

impl Projection {
    pub fn visible_count(&self) -> usize {
        self.pixels.len()
    }
}

/// Result of projecting a 3D box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxProjection {
    /// Pixel coordinates of the corners in front of the camera; `None` when
    /// every corner is behind it. May include off-image coordinates.
    pub corners: Option<Vec<Vector2<f64>>>,
    /// True if at least one projected corner lands inside the image
    pub is_visible: bool,
}

/// Sensor-local points to world frame via `T_world_ego · T_ego_sensor`.
pub fn transform_to_world(
    points_local: &[Vector3<f64>],
    ego_pose: &EgoPoseRecord,
    calibration: &CalibratedSensorRecord,
) -> Result<Vec<Vector3<f64>>, CoreError> {
    let world_from_ego = RigidTransform::compose(ego_pose.translation, ego_pose.rotation)?;
    let ego_from_sensor = RigidTransform::compose(calibration.translation, calibration.rotation)?;
    Ok(world_from_ego.chain(&ego_from_sensor).transform_points(points_local))
}

/// Projects world points into the image.
///
/// # Arguments
/// * `points_world` - Points in world frame
/// * `world_to_camera` - Inverse of the OpenCV camera-to-world pose
/// * `intrinsics` - Pinhole parameters
/// * `image_size` - Bounds used for the in-image test
pub fn project(
    points_world: &[Vector3<f64>],
    world_to_camera: &RigidTransform,
    intrinsics: &CameraIntrinsics,
    image_size: ImageSize,
) -> Projection {
    let mut projection = Projection {
        pixels: Vec::new(),
        depths: Vec::new(),
        visible: Vec::with_capacity(points_world.len()),
    };

    for point in points_world {
        let camera = world_to_camera.transform_point(point);
        let kept = if camera.z > 0.0 {
            let pixel = intrinsics.project(&camera);
            if image_size.contains(&pixel) {
                projection.pixels.push(pixel);
                projection.depths.push(camera.z);
                true
            } else {
                false
            }
        } else {
            false
        };
        projection.visible.push(kept);
    }

    projection
}

/// Projects the eight corners of a box.
///
/// Corners behind the camera are dropped before projection; the remaining
/// ones are returned whether or not they land inside the image.
pub fn project_box(
    bbox: &BoundingBox3D,
    world_to_camera: &RigidTransform,
    intrinsics: &CameraIntrinsics,
    image_size: ImageSize,
) -> BoxProjection {
    let corners: Vec<Vector2<f64>> = bbox
        .corners()
        .iter()
        .map(|corner| world_to_camera.transform_point(corner))
        .filter(|camera| camera.z > 0.0)
        .map(|camera| intrinsics.project(&camera))
        .collect();

    if corners.is_empty() {
        return BoxProjection {
            corners: None,
            is_visible: false,
        };
    }

    let is_visible = corners.iter().any(|c| image_size.contains(c));
    BoxProjection {
        corners: Some(corners),
        is_visible,
    }
}
