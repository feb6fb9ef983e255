//! End-to-end scene export against the synthetic three-frame log.

mod common;

use approx::assert_relative_eq;
use common::*;
use nerfprep_core::{CategoryClassifier, DepthSettings, DynamicClasses};
use nerfprep_env::SensorLog;
use nerfprep_export::{
    analyze_scene, export_scene, plan_scene, ExportConfig, ExportError, FrameStage, FsSink,
    IntrinsicsPolicy, MaskMode, MemorySink, TransformsJson, MANIFEST_FILE,
};

fn manifest(sink: &MemorySink) -> TransformsJson {
    let bytes = sink.get(MANIFEST_FILE).expect("manifest written");
    serde_json::from_slice(&bytes).expect("valid manifest")
}

fn lidar_and_depth() -> ExportConfig {
    ExportConfig {
        mask: MaskMode::Lidar {
            dynamic_classes: DynamicClasses::default(),
            dilation: 1,
        },
        depth: Some(DepthSettings::default()),
        ..ExportConfig::default()
    }
}

#[test]
fn test_images_only_export() {
    let log = three_frame_log();
    let sink = MemorySink::new();

    let report = export_scene(&log, SCENE_TOKEN, &ExportConfig::default(), &sink).unwrap();
    assert_eq!(report.scene_name, SCENE_NAME);
    assert_eq!(report.frames, FRAMES);
    assert_eq!(report.masks_written, 0);
    assert_eq!(report.depth_written, 0);

    let manifest = manifest(&sink);
    assert_eq!(manifest.camera_model, "OPENCV");
    assert_eq!((manifest.w, manifest.h), (100, 100));
    assert_eq!((manifest.fl_x, manifest.fl_y, manifest.cx, manifest.cy), (100.0, 100.0, 50.0, 50.0));
    assert_eq!(manifest.frames.len(), FRAMES);

    for (i, frame) in manifest.frames.iter().enumerate() {
        assert_eq!(frame.file_path, format!("images/{i:04}.jpg"));
        assert_eq!(frame.mask_path, None);
        assert_eq!(frame.depth_file_path, None);

        // Identity rotation flipped to OpenGL, translation along +x
        let m = frame.transform_matrix;
        assert_eq!(m[0], [1.0, 0.0, 0.0, STEP_METRES * i as f64]);
        assert_eq!(m[1], [0.0, -1.0, 0.0, 0.0]);
        assert_eq!(m[2], [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(m[3], [0.0, 0.0, 0.0, 1.0]);

        assert_eq!(sink.get(&frame.file_path), Some(image_bytes(i)));
    }
    assert_eq!(sink.len(), FRAMES + 1);
}

#[test]
fn test_forward_camera_pose_in_opengl_axes() {
    let mut log = three_frame_log();
    mount_camera_forward(&mut log);
    let sink = MemorySink::new();

    export_scene(&log, SCENE_TOKEN, &ExportConfig::default(), &sink).unwrap();
    let m = manifest(&sink).frames[1].transform_matrix;

    // OpenGL camera looks down -z: its +z column points backward (-x)
    assert_relative_eq!(m[0][2], -1.0, epsilon = 1e-12);
    // Camera +y (up) is world +z
    assert_relative_eq!(m[2][1], 1.0, epsilon = 1e-12);
    assert_relative_eq!(m[0][3], STEP_METRES, epsilon = 1e-12);
}

#[test]
fn test_lidar_masks_and_depth() {
    let log = three_frame_log();
    let sink = MemorySink::new();

    let report = export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &sink).unwrap();
    assert_eq!(report.masks_written, FRAMES);
    assert_eq!(report.depth_written, FRAMES);
    assert_eq!(report.mask_diagnostics.evidence, FRAMES);
    assert_eq!(report.depth_saturated_pixels, 0);

    let manifest = manifest(&sink);
    for (i, frame) in manifest.frames.iter().enumerate() {
        assert_eq!(frame.mask_path.as_deref(), Some(format!("masks/{i:04}.png").as_str()));
        assert_eq!(frame.depth_file_path.as_deref(), Some(format!("depth/{i:04}.png").as_str()));

        let mask = decode_luma8(&sink.get(&format!("masks/{i:04}.png")).unwrap());
        assert_eq!(mask.dimensions(), (100, 100));
        assert_eq!(mask.get_pixel(60, 50)[0], 0);
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));

        // 5 m point occludes the 12 m point on the same pixel
        let depth = decode_luma16(&sink.get(&format!("depth/{i:04}.png")).unwrap());
        assert_eq!(depth.get_pixel(50, 50)[0], 5000);
        assert_eq!(depth.get_pixel(60, 50)[0], 0);
        assert_eq!(depth.pixels().filter(|p| p[0] != 0).count(), 1);
    }
}

#[test]
fn test_bbox_masks() {
    let log = three_frame_log();
    let sink = MemorySink::new();
    let config = ExportConfig {
        mask: MaskMode::BoundingBox {
            classifier: CategoryClassifier::default(),
            dilation: 1,
        },
        ..ExportConfig::default()
    };

    let report = export_scene(&log, SCENE_TOKEN, &config, &sink).unwrap();
    assert_eq!(report.mask_diagnostics.evidence, FRAMES);
    assert_eq!(report.mask_diagnostics.drawn, FRAMES);
    assert_eq!(report.mask_diagnostics.hull_fallbacks, 0);

    let mask = decode_luma8(&sink.get("masks/0001.png").unwrap());
    assert_eq!(mask.get_pixel(25, 50)[0], 0);
    // Static barrier stays included
    assert_eq!(mask.get_pixel(80, 50)[0], 255);
    assert_eq!(mask.get_pixel(50, 50)[0], 255);
}

#[test]
fn test_parallel_matches_sequential() {
    let log = three_frame_log();

    let sequential = MemorySink::new();
    export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &sequential).unwrap();

    let parallel = MemorySink::new();
    let config = ExportConfig {
        parallel: true,
        ..lidar_and_depth()
    };
    export_scene(&log, SCENE_TOKEN, &config, &parallel).unwrap();

    assert_eq!(sequential.into_files(), parallel.into_files());
}

#[test]
fn test_export_is_idempotent() {
    let log = three_frame_log();
    let first = MemorySink::new();
    let second = MemorySink::new();

    export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &first).unwrap();
    export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &second).unwrap();

    assert_eq!(first.into_files(), second.into_files());
}

#[test]
fn test_missing_image_fails_without_manifest() {
    let mut log = three_frame_log();
    log.remove_blob(&image_path(1));
    let sink = MemorySink::new();

    let err = export_scene(&log, SCENE_TOKEN, &ExportConfig::default(), &sink).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Frame {
            index: 1,
            stage: FrameStage::ImageCopy,
            ..
        }
    ));
    assert!(!sink.contains(MANIFEST_FILE));
}

#[test]
fn test_missing_labels_fail_at_label_loading() {
    let mut log = three_frame_log();
    log.remove_blob(&label_path(2));
    let sink = MemorySink::new();

    let err = export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &sink).unwrap_err();
    assert_eq!(err.frame_index(), Some(2));
    assert_eq!(err.stage(), Some(FrameStage::LabelLoading));
    assert!(!sink.contains(MANIFEST_FILE));
}

#[test]
fn test_missing_lidar_channel_is_reported() {
    let mut log = three_frame_log();
    remove_lidar(&mut log, 1);

    // Images-only export does not need LiDAR
    assert!(export_scene(&log, SCENE_TOKEN, &ExportConfig::default(), &MemorySink::new()).is_ok());

    let err = export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &MemorySink::new()).unwrap_err();
    match err {
        ExportError::FrameDataMissing { index, channel } => {
            assert_eq!(index, 1);
            assert_eq!(channel, "LIDAR_TOP");
        }
        other => panic!("expected FrameDataMissing, got {other:?}"),
    }
}

#[test]
fn test_intrinsics_policy() {
    let mut log = three_frame_log();
    change_focal_length(&mut log, 2);

    // First-frame intrinsics are trusted by default
    let plan = plan_scene(&log, SCENE_TOKEN, &ExportConfig::default()).unwrap();
    assert_eq!(plan.intrinsics.fl_x, 100.0);
    assert_eq!(plan.len(), FRAMES);

    let strict = ExportConfig {
        intrinsics_policy: IntrinsicsPolicy::Verify,
        ..ExportConfig::default()
    };
    let err = plan_scene(&log, SCENE_TOKEN, &strict).unwrap_err();
    assert!(matches!(err, ExportError::IntrinsicsChanged { index: 2 }));
}

#[test]
fn test_unknown_scene_and_empty_scene() {
    let log = three_frame_log();
    let err = export_scene(&log, "nope", &ExportConfig::default(), &MemorySink::new()).unwrap_err();
    assert!(matches!(err, ExportError::Scene(_)));

    let mut log = nerfprep_env::MemoryLog::new();
    log.insert_scene(nerfprep_env::SceneRecord {
        token: "empty".to_string(),
        name: "scene-empty".to_string(),
        description: String::new(),
        first_sample_token: String::new(),
        nbr_samples: 0,
    });
    let err = export_scene(&log, "empty", &ExportConfig::default(), &MemorySink::new()).unwrap_err();
    assert!(matches!(err, ExportError::EmptyScene(name) if name == "scene-empty"));
}

#[test]
fn test_filesystem_export() {
    let dir = tempfile::tempdir().unwrap();
    let log = three_frame_log();
    let sink = FsSink::new(dir.path());

    let report = export_scene(&log, SCENE_TOKEN, &lidar_and_depth(), &sink).unwrap();

    let root = dir.path();
    let manifest: TransformsJson =
        serde_json::from_slice(&std::fs::read(root.join(&report.manifest_path)).unwrap()).unwrap();
    assert_eq!(manifest.frames.len(), FRAMES);
    for frame in &manifest.frames {
        assert!(root.join(&frame.file_path).is_file());
        assert!(root.join(frame.mask_path.as_ref().unwrap()).is_file());
        assert!(root.join(frame.depth_file_path.as_ref().unwrap()).is_file());
    }
    assert!(!root.join("transforms.json.tmp").exists());
    assert_eq!(std::fs::read(root.join("images/0002.jpg")).unwrap(), image_bytes(2));
}

#[test]
fn test_failed_reexport_removes_previous_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FsSink::new(dir.path());
    let manifest_path = dir.path().join(MANIFEST_FILE);

    export_scene(&three_frame_log(), SCENE_TOKEN, &lidar_and_depth(), &sink).unwrap();
    assert!(manifest_path.is_file());

    let mut log = three_frame_log();
    log.remove_blob(&image_path(2));
    let config = ExportConfig {
        mask: MaskMode::bounding_box(),
        ..ExportConfig::default()
    };
    let err = export_scene(&log, SCENE_TOKEN, &config, &sink).unwrap_err();
    assert_eq!(err.stage(), Some(FrameStage::ImageCopy));
    assert!(!manifest_path.exists());
}

#[test]
fn test_cyclic_scene_fails_instead_of_looping() {
    let mut log = three_frame_log();
    let mut last = log.sample("sample2").unwrap();
    last.next = Some("sample0".to_string());
    log.insert_sample(last);

    let err = plan_scene(&log, SCENE_TOKEN, &ExportConfig::default()).unwrap_err();
    assert_eq!(err.frame_index(), Some(FRAMES));
    assert_eq!(err.stage(), Some(FrameStage::PoseResolution));

    assert!(analyze_scene(&log, SCENE_TOKEN, "CAM_FRONT").is_err());
}

#[test]
fn test_scene_motion() {
    let log = three_frame_log();
    let motion = analyze_scene(&log, SCENE_TOKEN, "CAM_FRONT").unwrap();

    assert_eq!(motion.scene_name, SCENE_NAME);
    assert_eq!(motion.frames, FRAMES);
    // 2 m per 0.5 s
    assert_relative_eq!(motion.mean_speed_mps, 4.0, epsilon = 1e-12);
    assert_relative_eq!(motion.stop_ratio, 0.0);
}
