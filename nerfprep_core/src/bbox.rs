//! Oriented 3D bounding boxes from sample annotations.

use crate::error::CoreError;
use crate::transform::RigidTransform;
use nalgebra::{Matrix3, Vector3};
use nerfprep_env::AnnotationRecord;

/// A world-frame oriented box for one annotation in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox3D {
    pub center: Vector3<f64>,
    /// `[width, length, height]` in metres
    pub size: [f64; 3],
    pub rotation: Matrix3<f64>,
    /// Dot-separated category name, e.g. `vehicle.car`
    pub category: String,
}

impl BoundingBox3D {
    /// Builds a box from an annotation; the rotation quaternion is
    /// normalized the same way poses are.
    pub fn from_annotation(annotation: &AnnotationRecord) -> Result<Self, CoreError> {
        let pose = RigidTransform::compose(annotation.translation, annotation.rotation)?;
        Ok(Self {
            center: pose.translation(),
            size: annotation.size,
            rotation: pose.rotation(),
            category: annotation.category_name.clone(),
        })
    }

    /// The eight world-frame corners.
    ///
    /// Box-local x runs along the length, y along the width and z along the
    /// height. The first four corners face +x (front), the last four -x;
    /// within each face the order is top-left, top-right, bottom-right,
    /// bottom-left seen from outside.
    pub fn corners(&self) -> [Vector3<f64>; 8] {
        let [width, length, height] = self.size;
        let (hl, hw, hh) = (length / 2.0, width / 2.0, height / 2.0);

        const X: [f64; 8] = [1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
        const Y: [f64; 8] = [1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
        const Z: [f64; 8] = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0];

        std::array::from_fn(|i| {
            let local = Vector3::new(hl * X[i], hw * Y[i], hh * Z[i]);
            self.rotation * local + self.center
        })
    }
}
