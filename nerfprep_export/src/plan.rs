//! Plan phase: walk a scene and resolve everything a frame needs before any
//! artifact is written.
//!
//! Planning reads the log only. It fixes frame indices, poses, intrinsics and
//! output paths, so execution order cannot affect the result.

use crate::config::{ExportConfig, IntrinsicsPolicy, INTRINSICS_TOLERANCE};
use crate::error::{ExportError, FrameStage, StageContext};
use nerfprep_core::{AxisSigns, CameraIntrinsics, RigidTransform};
use nerfprep_env::{LogError, SampleDataRecord, SampleRecord, SceneRecord, SensorLog};
use std::collections::HashSet;
use tracing::debug;

/// Extension used when a source image path has none.
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

// ============================================================================
// SCENE WALK
// ============================================================================

/// Position of a walk along a scene's keyframe chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkState {
    /// Not started; the next step reads the scene's first sample
    Start,
    /// The next step resolves this sample token
    HasNextFrame(String),
    /// No keyframes remain
    Exhausted,
}

/// Iterator over a scene's keyframes in native `next` order.
///
/// A `next` chain that revisits a sample yields an `Invalid` error and ends
/// the walk.
pub struct SceneWalk<'a, L: SensorLog + ?Sized> {
    log: &'a L,
    scene: &'a SceneRecord,
    state: WalkState,
    visited: HashSet<String>,
}

impl<'a, L: SensorLog + ?Sized> SceneWalk<'a, L> {
    pub fn new(log: &'a L, scene: &'a SceneRecord) -> Self {
        Self {
            log,
            scene,
            state: WalkState::Start,
            visited: HashSet::new(),
        }
    }

    pub fn state(&self) -> &WalkState {
        &self.state
    }
}

impl<L: SensorLog + ?Sized> Iterator for SceneWalk<'_, L> {
    type Item = Result<SampleRecord, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == WalkState::Start {
            self.state = match self.scene.first_sample_token.as_str() {
                "" => WalkState::Exhausted,
                token => WalkState::HasNextFrame(token.to_string()),
            };
        }

        let token = match std::mem::replace(&mut self.state, WalkState::Exhausted) {
            WalkState::HasNextFrame(token) => token,
            _ => return None,
        };
        if !self.visited.insert(token.clone()) {
            return Some(Err(LogError::invalid(format!(
                "scene {} revisits sample {}",
                self.scene.name, token
            ))));
        }

        match self.log.sample(&token) {
            Ok(sample) => {
                if let Some(next) = sample.next.as_deref().filter(|t| !t.is_empty()) {
                    self.state = WalkState::HasNextFrame(next.to_string());
                }
                Some(Ok(sample))
            }
            // A broken link ends the walk
            Err(e) => Some(Err(e)),
        }
    }
}

// ============================================================================
// PLAN
// ============================================================================

/// Everything needed to produce one frame's artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub index: usize,
    pub sample_token: String,
    pub timestamp: i64,

    /// Camera capture copied as the frame image
    pub camera: SampleDataRecord,

    /// LiDAR capture, resolved only when masks or depth need it
    pub lidar_token: Option<String>,

    /// Camera-to-world, OpenCV axes
    pub camera_to_world: RigidTransform,

    /// World-to-camera, OpenCV axes
    pub world_to_camera: RigidTransform,

    /// Camera-to-world, OpenGL axes (the manifest pose)
    pub transform_matrix: RigidTransform,

    pub image_path: String,
    pub mask_path: Option<String>,
    pub depth_path: Option<String>,
}

/// A fully resolved scene, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePlan {
    pub scene: SceneRecord,
    pub intrinsics: CameraIntrinsics,
    pub frames: Vec<FramePlan>,
}

impl ScenePlan {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Walks a scene and resolves every frame.
///
/// # Errors
/// * `Scene` if the scene token does not resolve
/// * `EmptyScene` if the scene has no keyframes
/// * `FrameDataMissing` if a keyframe lacks a required channel
/// * `Frame { stage: PoseResolution }` if a capture, pose or calibration
///   cannot be resolved
/// * `IntrinsicsChanged` under `IntrinsicsPolicy::Verify`
pub fn plan_scene<L: SensorLog + ?Sized>(
    log: &L,
    scene_token: &str,
    config: &ExportConfig,
) -> Result<ScenePlan, ExportError> {
    let scene = log.scene(scene_token)?;
    let mut frames = Vec::new();
    let mut intrinsics: Option<CameraIntrinsics> = None;

    for (index, sample) in SceneWalk::new(log, &scene).enumerate() {
        let sample = sample.in_stage(index, FrameStage::PoseResolution)?;
        let (frame, frame_intrinsics) = plan_frame(log, index, &sample, config)?;

        match intrinsics {
            None => intrinsics = Some(frame_intrinsics),
            Some(first) => {
                if config.intrinsics_policy == IntrinsicsPolicy::Verify
                    && !first.approx_eq(&frame_intrinsics, INTRINSICS_TOLERANCE)
                {
                    return Err(ExportError::IntrinsicsChanged { index });
                }
            }
        }

        debug!("Planned frame {} ({})", index, frame.camera.filename);
        frames.push(frame);
    }

    let intrinsics = intrinsics.ok_or_else(|| ExportError::EmptyScene(scene.name.clone()))?;
    Ok(ScenePlan {
        scene,
        intrinsics,
        frames,
    })
}

fn plan_frame<L: SensorLog + ?Sized>(
    log: &L,
    index: usize,
    sample: &SampleRecord,
    config: &ExportConfig,
) -> Result<(FramePlan, CameraIntrinsics), ExportError> {
    let camera_token = required_channel(sample, index, &config.camera_channel)?;
    let lidar_token = if config.needs_lidar() {
        Some(required_channel(sample, index, &config.lidar_channel)?.to_string())
    } else {
        None
    };

    const STAGE: FrameStage = FrameStage::PoseResolution;
    let camera = log.sample_data(camera_token).in_stage(index, STAGE)?;
    let ego_pose = log.ego_pose(&camera.ego_pose_token).in_stage(index, STAGE)?;
    let calibration = log
        .calibrated_sensor(&camera.calibrated_sensor_token)
        .in_stage(index, STAGE)?;
    let intrinsics = CameraIntrinsics::from_capture(&calibration, &camera).in_stage(index, STAGE)?;

    let world_from_ego =
        RigidTransform::compose(ego_pose.translation, ego_pose.rotation).in_stage(index, STAGE)?;
    let ego_from_camera = RigidTransform::compose(calibration.translation, calibration.rotation)
        .in_stage(index, STAGE)?;
    let camera_to_world = world_from_ego.chain(&ego_from_camera);
    let world_to_camera = camera_to_world.invert().in_stage(index, STAGE)?;

    let frame = FramePlan {
        index,
        sample_token: sample.token.clone(),
        timestamp: sample.timestamp,
        image_path: format!("images/{:04}.{}", index, image_extension(&camera.filename)),
        mask_path: config.mask.is_enabled().then(|| format!("masks/{:04}.png", index)),
        depth_path: config.depth.is_some().then(|| format!("depth/{:04}.png", index)),
        camera,
        lidar_token,
        camera_to_world,
        world_to_camera,
        transform_matrix: camera_to_world.convention_flip(AxisSigns::OPENCV_TO_OPENGL),
    };
    Ok((frame, intrinsics))
}

fn required_channel<'s>(
    sample: &'s SampleRecord,
    index: usize,
    channel: &str,
) -> Result<&'s str, ExportError> {
    sample
        .channel_token(channel)
        .ok_or_else(|| ExportError::FrameDataMissing {
            index,
            channel: channel.to_string(),
        })
}

/// Lower-cased extension of a source image path.
fn image_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_IMAGE_EXTENSION)
        .to_ascii_lowercase()
}
