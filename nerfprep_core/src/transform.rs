//! Rigid-body transform algebra.
//!
//! All poses in the pipeline are 4x4 homogeneous matrices acting on column
//! vectors, so in `a.chain(&b)` the right-hand transform applies first:
//! `T_world_sensor = T_world_ego.chain(&T_ego_sensor)`.

use crate::error::CoreError;
use nalgebra::{Matrix3, Matrix4, Quaternion, UnitQuaternion, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Quaternions with a norm below this cannot describe a rotation.
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Diagonal sign pattern used to switch camera axis conventions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSigns(pub [f64; 4]);

impl AxisSigns {
    /// OpenCV camera (x right, y down, z forward) to OpenGL camera
    /// (x right, y up, z backward).
    pub const OPENCV_TO_OPENGL: AxisSigns = AxisSigns([1.0, -1.0, -1.0, 1.0]);
}

/// A 4x4 homogeneous rigid transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform(Matrix4<f64>);

impl RigidTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Wraps an existing homogeneous matrix without validation.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self(matrix)
    }

    /// Builds a transform from a translation and a (w, x, y, z) quaternion.
    ///
    /// The quaternion is normalized before use, so slightly drifted values
    /// from the log are accepted.
    ///
    /// # Errors
    /// `InvalidRotation` if the quaternion norm is ~0 or not finite.
    pub fn compose(translation: [f64; 3], rotation_wxyz: [f64; 4]) -> Result<Self, CoreError> {
        let [w, x, y, z] = rotation_wxyz;
        let quaternion = Quaternion::new(w, x, y, z);
        let norm = quaternion.norm();
        if !norm.is_finite() || norm < MIN_QUATERNION_NORM {
            return Err(CoreError::InvalidRotation(rotation_wxyz));
        }

        let rotation = UnitQuaternion::from_quaternion(quaternion).to_rotation_matrix();

        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(rotation.matrix());
        matrix
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&Vector3::from(translation));

        Ok(Self(matrix))
    }

    /// Matrix product `self · right` (right-hand transform applies first).
    pub fn chain(&self, right: &RigidTransform) -> RigidTransform {
        Self(self.0 * right.0)
    }

    /// Inverse transform (e.g. world->camera from camera->world).
    ///
    /// # Errors
    /// `SingularTransform` if the matrix is not invertible. For transforms
    /// built by `compose` this indicates corrupt input and is fatal.
    pub fn invert(&self) -> Result<RigidTransform, CoreError> {
        self.0
            .try_inverse()
            .map(Self)
            .ok_or(CoreError::SingularTransform)
    }

    /// Post-multiplies by `diag(signs)` to re-express the camera axes.
    pub fn convention_flip(&self, signs: AxisSigns) -> RigidTransform {
        Self(self.0 * Matrix4::from_diagonal(&Vector4::from(signs.0)))
    }

    /// Applies the transform to a single point.
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let h = self.0 * Vector4::new(point.x, point.y, point.z, 1.0);
        Vector3::new(h.x, h.y, h.z)
    }

    /// Applies the transform to every point, preserving order.
    pub fn transform_points(&self, points: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// The underlying homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Rotation block.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation column.
    pub fn translation(&self) -> Vector3<f64> {
        self.0.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Row-major nested array, the layout `transforms.json` expects.
    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.0[(r, c)];
            }
        }
        rows
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}
