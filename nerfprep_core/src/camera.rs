//! Pinhole camera intrinsics.

use crate::error::CoreError;
use nalgebra::{Vector2, Vector3};
use nerfprep_env::{CalibratedSensorRecord, SampleDataRecord};
use serde::{Deserialize, Serialize};

/// Raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if a continuous pixel coordinate lies in `[0,w) x [0,h)`.
    pub fn contains(&self, pixel: &Vector2<f64>) -> bool {
        pixel.x >= 0.0
            && pixel.x < self.width as f64
            && pixel.y >= 0.0
            && pixel.y < self.height as f64
    }

    /// Rounds a continuous coordinate to the nearest pixel, if that pixel
    /// exists.
    pub fn nearest_pixel(&self, pixel: &Vector2<f64>) -> Option<(u32, u32)> {
        let u = pixel.x.round();
        let v = pixel.y.round();
        if u >= 0.0 && u < self.width as f64 && v >= 0.0 && v < self.height as f64 {
            Some((u as u32, v as u32))
        } else {
            None
        }
    }

    /// Number of pixels.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Zero-skew pinhole intrinsics plus the image they apply to.
///
/// Field names follow the `transforms.json` schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Horizontal focal length in pixels.
    pub fl_x: f64,
    /// Vertical focal length in pixels.
    pub fl_y: f64,
    /// Principal point, horizontal, in pixels.
    pub cx: f64,
    /// Principal point, vertical, in pixels.
    pub cy: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl CameraIntrinsics {
    /// Extracts intrinsics from a row-major 3x3 camera matrix `K`.
    pub fn from_matrix(k: &[[f64; 3]; 3], width: u32, height: u32) -> Self {
        Self {
            fl_x: k[0][0],
            fl_y: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
            width,
            height,
        }
    }

    /// Intrinsics for a camera capture: `K` from its calibration, size from
    /// the capture record.
    pub fn from_capture(
        calibration: &CalibratedSensorRecord,
        capture: &SampleDataRecord,
    ) -> Result<Self, CoreError> {
        let k = calibration
            .camera_intrinsic
            .as_ref()
            .ok_or_else(|| CoreError::MissingIntrinsics(calibration.token.clone()))?;
        Ok(Self::from_matrix(k, capture.width, capture.height))
    }

    pub fn image_size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Pinhole projection of a camera-space point (OpenCV axes, z forward).
    ///
    /// The caller guarantees `z > 0`.
    pub fn project(&self, point_camera: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(
            self.fl_x * point_camera.x / point_camera.z + self.cx,
            self.fl_y * point_camera.y / point_camera.z + self.cy,
        )
    }

    /// True if every parameter matches `other` within `tolerance` pixels and
    /// the image sizes are identical.
    pub fn approx_eq(&self, other: &CameraIntrinsics, tolerance: f64) -> bool {
        self.width == other.width
            && self.height == other.height
            && (self.fl_x - other.fl_x).abs() <= tolerance
            && (self.fl_y - other.fl_y).abs() <= tolerance
            && (self.cx - other.cx).abs() <= tolerance
            && (self.cy - other.cy).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nuscenes_front() -> CameraIntrinsics {
        CameraIntrinsics::from_matrix(
            &[[1266.417, 0.0, 816.267], [0.0, 1266.417, 491.507], [0.0, 0.0, 1.0]],
            1600,
            900,
        )
    }

    #[test]
    fn test_from_matrix() {
        let k = nuscenes_front();
        assert_eq!(k.fl_x, 1266.417);
        assert_eq!(k.cy, 491.507);
        assert_eq!(k.image_size(), ImageSize::new(1600, 900));
    }

    #[test]
    fn test_principal_axis_hits_principal_point() {
        let k = nuscenes_front();
        let uv = k.project(&Vector3::new(0.0, 0.0, 12.0));

        assert_relative_eq!(uv.x, 816.267, epsilon = 1e-9);
        assert_relative_eq!(uv.y, 491.507, epsilon = 1e-9);
    }

    #[test]
    fn test_bounds_are_half_open() {
        let size = ImageSize::new(100, 50);
        assert!(size.contains(&Vector2::new(0.0, 0.0)));
        assert!(size.contains(&Vector2::new(99.9, 49.9)));
        assert!(!size.contains(&Vector2::new(100.0, 10.0)));
        assert!(!size.contains(&Vector2::new(10.0, -0.001)));
    }

    #[test]
    fn test_nearest_pixel_rejects_rounding_off_the_edge() {
        let size = ImageSize::new(100, 50);
        assert_eq!(size.nearest_pixel(&Vector2::new(10.4, 20.6)), Some((10, 21)));
        // Inside the half-open bounds but rounds to column 100
        assert_eq!(size.nearest_pixel(&Vector2::new(99.7, 3.0)), None);
    }

    #[test]
    fn test_missing_intrinsic_matrix() {
        let calibration = CalibratedSensorRecord {
            token: "cs_lidar".to_string(),
            sensor_token: "lidar".to_string(),
            translation: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            camera_intrinsic: None,
        };
        let capture = SampleDataRecord {
            token: "sd".to_string(),
            sample_token: "s".to_string(),
            ego_pose_token: "ep".to_string(),
            calibrated_sensor_token: "cs_lidar".to_string(),
            filename: "x.pcd.bin".to_string(),
            fileformat: "pcd".to_string(),
            width: 0,
            height: 0,
            timestamp: 0,
            is_key_frame: true,
        };

        let result = CameraIntrinsics::from_capture(&calibration, &capture);
        assert!(matches!(result, Err(CoreError::MissingIntrinsics(_))));
    }

    #[test]
    fn test_approx_eq_tolerance() {
        let a = nuscenes_front();
        let mut b = a;
        b.cx += 1e-6;
        assert!(a.approx_eq(&b, 1e-3));

        b.cx += 1.0;
        assert!(!a.approx_eq(&b, 1e-3));
    }
}
