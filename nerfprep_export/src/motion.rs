//! Scene motion analysis: how fast the ego vehicle moves through a scene.
//!
//! Slow scenes (or scenes with long stops) give denser multi-view coverage,
//! so this ranks candidate scenes before export.

use crate::error::{ExportError, FrameStage, StageContext};
use crate::plan::SceneWalk;
use nalgebra::Vector3;
use nerfprep_env::SensorLog;
use serde::{Deserialize, Serialize};

/// Steps slower than this count as stopped (m/s).
pub const STOP_SPEED_MPS: f64 = 1.0;

/// Keyframe spacing assumed when timestamps do not advance (2 Hz).
pub const NOMINAL_KEYFRAME_INTERVAL_S: f64 = 0.5;

const MICROS_PER_SECOND: f64 = 1e6;
const MPS_TO_KMH: f64 = 3.6;

/// Speed summary for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMotion {
    pub scene_name: String,
    pub frames: usize,
    pub mean_speed_mps: f64,
    /// Fraction of steps below `STOP_SPEED_MPS`
    pub stop_ratio: f64,
}

impl SceneMotion {
    pub fn mean_speed_kmh(&self) -> f64 {
        self.mean_speed_mps * MPS_TO_KMH
    }
}

/// Mean speed and stop ratio of a timestamped (µs) position track.
///
/// Fewer than two samples give `(0.0, 0.0)`.
pub fn speed_profile(track: &[(i64, Vector3<f64>)]) -> (f64, f64) {
    let speeds: Vec<f64> = track
        .windows(2)
        .map(|pair| {
            let (t0, p0) = pair[0];
            let (t1, p1) = pair[1];
            let dt = (t1 - t0) as f64 / MICROS_PER_SECOND;
            let dt = if dt > 0.0 { dt } else { NOMINAL_KEYFRAME_INTERVAL_S };
            (p1 - p0).norm() / dt
        })
        .collect();

    if speeds.is_empty() {
        return (0.0, 0.0);
    }
    let n = speeds.len() as f64;
    let mean = speeds.iter().sum::<f64>() / n;
    let stopped = speeds.iter().filter(|&&s| s < STOP_SPEED_MPS).count() as f64;
    (mean, stopped / n)
}

/// Analyzes one scene using the ego pose of each keyframe's camera capture.
pub fn analyze_scene<L: SensorLog + ?Sized>(
    log: &L,
    scene_token: &str,
    camera_channel: &str,
) -> Result<SceneMotion, ExportError> {
    let scene = log.scene(scene_token)?;
    let mut track = Vec::new();

    for (index, sample) in SceneWalk::new(log, &scene).enumerate() {
        let sample = sample.in_stage(index, FrameStage::PoseResolution)?;
        let camera_token =
            sample
                .channel_token(camera_channel)
                .ok_or_else(|| ExportError::FrameDataMissing {
                    index,
                    channel: camera_channel.to_string(),
                })?;
        let capture = log.sample_data(camera_token).in_stage(index, FrameStage::PoseResolution)?;
        let pose = log
            .ego_pose(&capture.ego_pose_token)
            .in_stage(index, FrameStage::PoseResolution)?;
        track.push((sample.timestamp, Vector3::from(pose.translation)));
    }

    let (mean_speed_mps, stop_ratio) = speed_profile(&track);
    Ok(SceneMotion {
        scene_name: scene.name,
        frames: track.len(),
        mean_speed_mps,
        stop_ratio,
    })
}

/// Analyzes several scenes, slowest first.
pub fn rank_scenes<L: SensorLog + ?Sized>(
    log: &L,
    scene_tokens: &[String],
    camera_channel: &str,
) -> Result<Vec<SceneMotion>, ExportError> {
    let mut results = scene_tokens
        .iter()
        .map(|token| analyze_scene(log, token, camera_channel))
        .collect::<Result<Vec<_>, _>>()?;
    results.sort_by(|a, b| a.mean_speed_mps.total_cmp(&b.mean_speed_mps));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_speed() {
        // 5 m every 0.5 s
        let track: Vec<_> = (0..4)
            .map(|i| (i as i64 * 500_000, Vector3::new(5.0 * i as f64, 0.0, 0.0)))
            .collect();
        let (mean, stop_ratio) = speed_profile(&track);

        assert_relative_eq!(mean, 10.0, epsilon = 1e-12);
        assert_relative_eq!(stop_ratio, 0.0);
    }

    #[test]
    fn test_stops_are_counted() {
        let track = vec![
            (0, Vector3::new(0.0, 0.0, 0.0)),
            (1_000_000, Vector3::new(0.2, 0.0, 0.0)),
            (2_000_000, Vector3::new(10.2, 0.0, 0.0)),
        ];
        let (mean, stop_ratio) = speed_profile(&track);

        assert_relative_eq!(mean, 5.1, epsilon = 1e-12);
        assert_relative_eq!(stop_ratio, 0.5);
    }

    #[test]
    fn test_non_advancing_timestamps_use_nominal_interval() {
        let track = vec![(7, Vector3::zeros()), (7, Vector3::new(0.0, 3.0, 4.0))];
        let (mean, _) = speed_profile(&track);
        assert_relative_eq!(mean, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_frame_has_no_speed() {
        assert_eq!(speed_profile(&[(0, Vector3::zeros())]), (0.0, 0.0));
        assert_eq!(speed_profile(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_kmh_conversion() {
        let motion = SceneMotion {
            scene_name: "scene-0103".to_string(),
            frames: 40,
            mean_speed_mps: 5.0,
            stop_ratio: 0.1,
        };
        assert_relative_eq!(motion.mean_speed_kmh(), 18.0, epsilon = 1e-12);
    }
}
