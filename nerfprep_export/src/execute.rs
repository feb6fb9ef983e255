//! Execute phase: produce and write each planned frame's artifacts.

use crate::config::{ExportConfig, MaskMode};
use crate::error::{ExportError, FrameStage, StageContext};
use crate::plan::{FramePlan, ScenePlan};
use crate::sink::ArtifactSink;
use nalgebra::Vector3;
use nerfprep_core::pointcloud::{load_labels, load_points};
use nerfprep_core::{
    rasterize_bbox_mask, rasterize_depth, rasterize_lidar_mask, transform_to_world,
    BoundingBox3D, CameraIntrinsics, ClassId, DepthStats, MaskDiagnostics, PointCloud,
};
use nerfprep_env::SensorLog;
use rayon::prelude::*;
use tracing::{debug, warn};

/// What was written for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameOutcome {
    pub index: usize,
    pub mask: Option<MaskDiagnostics>,
    pub depth: Option<DepthStats>,
}

/// Executes every frame of a plan.
///
/// Frames run on the rayon pool when `config.parallel` is set. Indices and
/// paths come from the plan, so the artifacts are identical either way. The
/// outcomes are returned in index order.
pub fn execute_plan<L, S>(
    log: &L,
    plan: &ScenePlan,
    config: &ExportConfig,
    sink: &S,
) -> Result<Vec<FrameOutcome>, ExportError>
where
    L: SensorLog + ?Sized,
    S: ArtifactSink + ?Sized,
{
    let run = |frame: &FramePlan| execute_frame(log, frame, &plan.intrinsics, config, sink);

    if config.parallel {
        plan.frames.par_iter().map(run).collect()
    } else {
        plan.frames.iter().map(run).collect()
    }
}

/// Produces and writes one frame's image, mask and depth.
pub fn execute_frame<L, S>(
    log: &L,
    frame: &FramePlan,
    intrinsics: &CameraIntrinsics,
    config: &ExportConfig,
    sink: &S,
) -> Result<FrameOutcome, ExportError>
where
    L: SensorLog + ?Sized,
    S: ArtifactSink + ?Sized,
{
    let index = frame.index;
    let mut outcome = FrameOutcome {
        index,
        ..FrameOutcome::default()
    };

    // Image: copied byte for byte
    let image = log.read_blob(&frame.camera.filename).in_stage(index, FrameStage::ImageCopy)?;
    sink.write(&frame.image_path, &image)
        .in_stage(index, FrameStage::ArtifactWrite)?;

    let cloud = match &frame.lidar_token {
        Some(token) => Some(load_world_cloud(log, index, token)?),
        None => None,
    };
    let size = intrinsics.image_size();

    // Mask
    if let Some(mask_path) = &frame.mask_path {
        let output = match &config.mask {
            MaskMode::None => None,
            MaskMode::Lidar {
                dynamic_classes,
                dilation,
            } => {
                let (points, labels) = labelled(cloud.as_ref(), index, &config.lidar_channel)?;
                let output = rasterize_lidar_mask(
                    points,
                    labels,
                    &frame.world_to_camera,
                    intrinsics,
                    size,
                    dynamic_classes,
                    *dilation,
                )
                .in_stage(index, FrameStage::Rasterization)?;
                Some(output)
            }
            MaskMode::BoundingBox {
                classifier,
                dilation,
            } => {
                let boxes = load_boxes(log, index, &frame.sample_token)?;
                Some(rasterize_bbox_mask(
                    &boxes,
                    &frame.world_to_camera,
                    intrinsics,
                    size,
                    classifier,
                    *dilation,
                ))
            }
        };

        if let Some(output) = output {
            if output.diagnostics.hull_fallbacks > 0 {
                warn!(
                    "Frame {}: {} box(es) masked by bounding rectangle",
                    index, output.diagnostics.hull_fallbacks
                );
            }
            let png = output
                .raster
                .encode_png()
                .in_stage(index, FrameStage::Rasterization)?;
            sink.write(mask_path, &png)
                .in_stage(index, FrameStage::ArtifactWrite)?;
            outcome.mask = Some(output.diagnostics);
        }
    }

    // Depth
    if let (Some(depth_path), Some(settings)) = (&frame.depth_path, &config.depth) {
        let (points, labels) = labelled(cloud.as_ref(), index, &config.lidar_channel)?;
        let output = rasterize_depth(
            points,
            labels,
            &frame.world_to_camera,
            intrinsics,
            size,
            settings,
        )
        .in_stage(index, FrameStage::Rasterization)?;
        if output.stats.saturated > 0 {
            warn!(
                "Frame {}: {} depth pixel(s) beyond 65.535 m left empty",
                index, output.stats.saturated
            );
        }
        let png = output
            .raster
            .encode_png()
            .in_stage(index, FrameStage::Rasterization)?;
        sink.write(depth_path, &png)
            .in_stage(index, FrameStage::ArtifactWrite)?;
        outcome.depth = Some(output.stats);
    }

    debug!("Frame {} written", index);
    Ok(outcome)
}

/// Loads a LiDAR capture and moves its points into world frame.
fn load_world_cloud<L: SensorLog + ?Sized>(
    log: &L,
    index: usize,
    lidar_token: &str,
) -> Result<PointCloud, ExportError> {
    let capture = log.sample_data(lidar_token).in_stage(index, FrameStage::PointLoading)?;
    let points = load_points(log, &capture).in_stage(index, FrameStage::PointLoading)?;

    let ego_pose = log
        .ego_pose(&capture.ego_pose_token)
        .in_stage(index, FrameStage::PoseResolution)?;
    let calibration = log
        .calibrated_sensor(&capture.calibrated_sensor_token)
        .in_stage(index, FrameStage::PoseResolution)?;
    let points_world = transform_to_world(&points, &ego_pose, &calibration)
        .in_stage(index, FrameStage::PoseResolution)?;

    let labels = load_labels(log, lidar_token).in_stage(index, FrameStage::LabelLoading)?;
    PointCloud::new(lidar_token, points_world, labels).in_stage(index, FrameStage::LabelLoading)
}

/// Points and labels of a cloud that must carry labels.
fn labelled<'c>(
    cloud: Option<&'c PointCloud>,
    index: usize,
    channel: &str,
) -> Result<(&'c [Vector3<f64>], &'c [ClassId]), ExportError> {
    // The plan resolves a LiDAR capture whenever a mode needs one
    let Some(cloud) = cloud else {
        return Err(ExportError::FrameDataMissing {
            index,
            channel: channel.to_string(),
        });
    };
    let labels = cloud.require_labels().in_stage(index, FrameStage::LabelLoading)?;
    Ok((&cloud.points, labels))
}

fn load_boxes<L: SensorLog + ?Sized>(
    log: &L,
    index: usize,
    sample_token: &str,
) -> Result<Vec<BoundingBox3D>, ExportError> {
    log.sample_annotations(sample_token)
        .in_stage(index, FrameStage::AnnotationLoading)?
        .iter()
        .map(|annotation| {
            BoundingBox3D::from_annotation(annotation).in_stage(index, FrameStage::AnnotationLoading)
        })
        .collect()
}
