//! Synthetic three-frame scene shared by the integration tests.
//!
//! Every rotation is the identity, so camera axes coincide with world axes
//! and the camera looks along world +z. The ego vehicle advances 2 m along
//! +x per keyframe (0.5 s apart). Intrinsics: 100x100 px, f = 100, c = 50.
//!
//! Each LiDAR sweep (sensor frame = ego frame) holds:
//! - a static point 5 m ahead and one 12 m ahead, both on the optical axis
//!   (pixel 50,50)
//! - a dynamic vehicle point at (1, 0, 10) (pixel 60,50)
//!
//! Each keyframe is annotated with a dynamic car centered 2 m left of the
//! optical axis at 10 m (around pixel 25,50) and a static barrier 3 m to
//! the right (around pixel 80,50).

#![allow(dead_code)]

use nalgebra::Vector3;
use nerfprep_core::pointcloud::encode_points;
use nerfprep_env::{
    AnnotationRecord, CalibratedSensorRecord, EgoPoseRecord, LidarSegRecord, MemoryLog,
    SampleDataRecord, SampleRecord, SceneRecord,
};
use std::collections::BTreeMap;

pub const SCENE_TOKEN: &str = "scene-token";
pub const SCENE_NAME: &str = "scene-0001";
pub const FRAMES: usize = 3;
pub const STEP_METRES: f64 = 2.0;
pub const IDENTITY: [f64; 4] = [1.0, 0.0, 0.0, 0.0];

pub fn image_path(i: usize) -> String {
    format!("samples/CAM_FRONT/frame{i}.jpg")
}

pub fn image_bytes(i: usize) -> Vec<u8> {
    format!("jpeg-bytes-{i}").into_bytes()
}

pub fn label_path(i: usize) -> String {
    format!("lidarseg/v1.0-mini/seg{i}.bin")
}

fn camera_calibration(token: &str, focal: f64) -> CalibratedSensorRecord {
    CalibratedSensorRecord {
        token: token.to_string(),
        sensor_token: "cam_front".to_string(),
        translation: [0.0; 3],
        rotation: IDENTITY,
        camera_intrinsic: Some([[focal, 0.0, 50.0], [0.0, focal, 50.0], [0.0, 0.0, 1.0]]),
    }
}

fn capture(token: &str, sample: &str, ego: &str, calib: &str, filename: String, size: u32) -> SampleDataRecord {
    SampleDataRecord {
        token: token.to_string(),
        sample_token: sample.to_string(),
        ego_pose_token: ego.to_string(),
        calibrated_sensor_token: calib.to_string(),
        filename,
        fileformat: if size > 0 { "jpg" } else { "pcd" }.to_string(),
        width: size,
        height: size,
        timestamp: 0,
        is_key_frame: true,
    }
}

fn annotation(sample: &str, token: &str, center: [f64; 3], category: &str) -> AnnotationRecord {
    AnnotationRecord {
        token: token.to_string(),
        sample_token: sample.to_string(),
        translation: center,
        size: [2.0, 2.0, 2.0],
        rotation: IDENTITY,
        category_name: category.to_string(),
    }
}

/// Builds the synthetic scene.
pub fn three_frame_log() -> MemoryLog {
    let mut log = MemoryLog::new();

    log.insert_scene(SceneRecord {
        token: SCENE_TOKEN.to_string(),
        name: SCENE_NAME.to_string(),
        description: "synthetic straight drive".to_string(),
        first_sample_token: "sample0".to_string(),
        nbr_samples: FRAMES,
    });
    log.insert_calibrated_sensor(camera_calibration("cs_cam", 100.0));
    log.insert_calibrated_sensor(CalibratedSensorRecord {
        token: "cs_lidar".to_string(),
        sensor_token: "lidar_top".to_string(),
        translation: [0.0; 3],
        rotation: IDENTITY,
        camera_intrinsic: None,
    });

    let sweep = encode_points(&[
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(0.0, 0.0, 12.0),
        Vector3::new(1.0, 0.0, 10.0),
    ]);

    for i in 0..FRAMES {
        let sample = format!("sample{i}");
        let cam = format!("cam{i}");
        let lidar = format!("lidar{i}");
        let ego = format!("ego{i}");
        let x = STEP_METRES * i as f64;

        let mut data = BTreeMap::new();
        data.insert("CAM_FRONT".to_string(), cam.clone());
        data.insert("LIDAR_TOP".to_string(), lidar.clone());
        log.insert_sample(SampleRecord {
            token: sample.clone(),
            scene_token: SCENE_TOKEN.to_string(),
            timestamp: i as i64 * 500_000,
            next: (i + 1 < FRAMES).then(|| format!("sample{}", i + 1)),
            prev: i.checked_sub(1).map(|p| format!("sample{p}")),
            data,
        });

        log.insert_ego_pose(EgoPoseRecord {
            token: ego.clone(),
            translation: [x, 0.0, 0.0],
            rotation: IDENTITY,
            timestamp: i as i64 * 500_000,
        });

        log.insert_sample_data(capture(&cam, &sample, &ego, "cs_cam", image_path(i), 100));
        log.insert_blob(image_path(i), image_bytes(i));

        let lidar_file = format!("samples/LIDAR_TOP/sweep{i}.pcd.bin");
        log.insert_sample_data(capture(&lidar, &sample, &ego, "cs_lidar", lidar_file.clone(), 0));
        log.insert_blob(lidar_file, sweep.clone());
        log.insert_lidarseg(LidarSegRecord {
            token: format!("seg{i}"),
            sample_data_token: lidar.clone(),
            filename: label_path(i),
        });
        log.insert_blob(label_path(i), vec![1, 1, 17]);

        log.insert_annotation(annotation(&sample, &format!("car{i}"), [x - 2.0, 0.0, 10.0], "vehicle.car"));
        log.insert_annotation(annotation(
            &sample,
            &format!("barrier{i}"),
            [x + 3.0, 0.0, 10.0],
            "movable_object.barrier",
        ));
    }

    log
}

/// Points frame `index` at a camera calibration with a different focal length.
pub fn change_focal_length(log: &mut MemoryLog, index: usize) {
    log.insert_calibrated_sensor(camera_calibration("cs_cam_zoomed", 120.0));
    let sample = format!("sample{index}");
    let ego = format!("ego{index}");
    log.insert_sample_data(capture(
        &format!("cam{index}"),
        &sample,
        &ego,
        "cs_cam_zoomed",
        image_path(index),
        100,
    ));
}

/// Replaces the camera calibration with the nuScenes CAM_FRONT mounting
/// (optical axis along ego +x, image down along ego -z).
pub fn mount_camera_forward(log: &mut MemoryLog) {
    let mut calibration = camera_calibration("cs_cam", 100.0);
    calibration.rotation = [0.5, -0.5, 0.5, -0.5];
    log.insert_calibrated_sensor(calibration);
}

/// Drops the LiDAR capture from keyframe `index`.
pub fn remove_lidar(log: &mut MemoryLog, index: usize) {
    let cam = format!("cam{index}");
    let mut data = BTreeMap::new();
    data.insert("CAM_FRONT".to_string(), cam);
    log.insert_sample(SampleRecord {
        token: format!("sample{index}"),
        scene_token: SCENE_TOKEN.to_string(),
        timestamp: index as i64 * 500_000,
        next: (index + 1 < FRAMES).then(|| format!("sample{}", index + 1)),
        prev: index.checked_sub(1).map(|p| format!("sample{p}")),
        data,
    });
}

/// Decodes an 8-bit PNG from a sink.
pub fn decode_luma8(bytes: &[u8]) -> image::GrayImage {
    image::load_from_memory(bytes)
        .expect("valid PNG")
        .into_luma8()
}

/// Decodes a 16-bit PNG from a sink.
pub fn decode_luma16(bytes: &[u8]) -> image::ImageBuffer<image::Luma<u16>, Vec<u16>> {
    image::load_from_memory(bytes)
        .expect("valid PNG")
        .into_luma16()
}
