//! nerfprep core - sensor-fusion projection pipeline
//!
//! Turns one camera instant of a driving log into training supervision:
//! 1. **Transform Algebra**: sensor → ego → world rigid transforms, OpenCV → OpenGL flip
//! 2. **Projection Engine**: world points and box corners into camera pixels
//! 3. **Rasterizers**: sparse millimetre depth from static LiDAR, 0/255
//!    exclusion masks from dynamic LiDAR points or 3D boxes

pub mod bbox;
pub mod camera;
pub mod depth;
pub mod error;
pub mod mask;
pub mod pointcloud;
pub mod projection;
pub mod raster;
pub mod semantic;
pub mod transform;

// Re-export key types for convenience
pub use bbox::BoundingBox3D;
pub use camera::{CameraIntrinsics, ImageSize};
pub use depth::{rasterize_depth, DepthOutput, DepthSettings, DepthStats};
pub use error::CoreError;
pub use mask::{rasterize_bbox_mask, rasterize_lidar_mask, MaskDiagnostics, MaskOutput};
pub use pointcloud::PointCloud;
pub use projection::{project, project_box, transform_to_world, BoxProjection, Projection};
pub use raster::{DepthRaster, MaskRaster};
pub use semantic::{CategoryClassifier, ClassGroup, ClassId, DynamicClasses, MotionTag};
pub use transform::{AxisSigns, RigidTransform};
