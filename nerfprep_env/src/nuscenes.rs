//! nuScenes JSON-table sensor log.
//!
//! Loads the metadata tables of one dataset version (`<dataroot>/<version>/*.json`)
//! into memory, resolves the joins the pipeline needs (keyframe channel map,
//! annotation category names) and serves them through `SensorLog`.

use crate::error::LogError;
use crate::log::SensorLog;
use crate::records::{
    AnnotationRecord, CalibratedSensorRecord, EgoPoseRecord, LidarSegRecord, SampleDataRecord,
    SampleRecord, SceneRecord,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// RAW TABLE ROWS (match the nuScenes JSON schema)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawScene {
    token: String,
    name: String,
    #[serde(default)]
    description: String,
    first_sample_token: String,
    #[serde(default)]
    nbr_samples: usize,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    token: String,
    timestamp: i64,
    #[serde(default)]
    prev: String,
    #[serde(default)]
    next: String,
    scene_token: String,
}

#[derive(Debug, Deserialize)]
struct RawSampleData {
    token: String,
    sample_token: String,
    ego_pose_token: String,
    calibrated_sensor_token: String,
    filename: String,
    #[serde(default)]
    fileformat: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    timestamp: i64,
    is_key_frame: bool,
}

#[derive(Debug, Deserialize)]
struct RawSensor {
    token: String,
    channel: String,
}

#[derive(Debug, Deserialize)]
struct RawCalibratedSensor {
    token: String,
    sensor_token: String,
    translation: [f64; 3],
    rotation: [f64; 4],
    #[serde(default)]
    camera_intrinsic: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawEgoPose {
    token: String,
    translation: [f64; 3],
    rotation: [f64; 4],
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawAnnotation {
    token: String,
    sample_token: String,
    instance_token: String,
    translation: [f64; 3],
    size: [f64; 3],
    rotation: [f64; 4],
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    token: String,
    category_token: String,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    token: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawLidarSeg {
    token: String,
    sample_data_token: String,
    filename: String,
}

// ============================================================================
// LOG
// ============================================================================

/// Sensor log backed by the nuScenes metadata tables.
#[derive(Debug)]
pub struct NuScenesLog {
    dataroot: PathBuf,
    version: String,

    /// Scenes in table order (index used by `scene_at`)
    scenes: Vec<SceneRecord>,
    scene_lookup: HashMap<String, usize>,

    samples: HashMap<String, SampleRecord>,
    sample_data: HashMap<String, SampleDataRecord>,
    ego_poses: HashMap<String, EgoPoseRecord>,
    calibrations: HashMap<String, CalibratedSensorRecord>,

    /// Keyed by LiDAR sample_data token
    lidarseg: HashMap<String, LidarSegRecord>,

    /// Keyed by sample token
    annotations: HashMap<String, Vec<AnnotationRecord>>,
}

impl NuScenesLog {
    /// Loads all tables of `version` below `dataroot`.
    ///
    /// # Arguments
    /// * `dataroot` - Dataset root (contains `samples/`, `sweeps/`, `<version>/`)
    /// * `version` - Table directory name, e.g. "v1.0-mini"
    ///
    /// The lidarseg table is optional; without it every LiDAR capture reports
    /// its labels as unavailable.
    pub fn open(dataroot: impl AsRef<Path>, version: &str) -> Result<Self, LogError> {
        let dataroot = dataroot.as_ref().to_path_buf();
        let table_dir = dataroot.join(version);

        let raw_scenes: Vec<RawScene> = load_table(&table_dir, "scene")?;
        let raw_samples: Vec<RawSample> = load_table(&table_dir, "sample")?;
        let raw_sample_data: Vec<RawSampleData> = load_table(&table_dir, "sample_data")?;
        let raw_sensors: Vec<RawSensor> = load_table(&table_dir, "sensor")?;
        let raw_calibrations: Vec<RawCalibratedSensor> =
            load_table(&table_dir, "calibrated_sensor")?;
        let raw_poses: Vec<RawEgoPose> = load_table(&table_dir, "ego_pose")?;
        let raw_annotations: Vec<RawAnnotation> = load_table(&table_dir, "sample_annotation")?;
        let raw_instances: Vec<RawInstance> = load_table(&table_dir, "instance")?;
        let raw_categories: Vec<RawCategory> = load_table(&table_dir, "category")?;
        let raw_lidarseg: Vec<RawLidarSeg> = load_optional_table(&table_dir, "lidarseg")?;

        let scenes: Vec<SceneRecord> = raw_scenes
            .into_iter()
            .map(|s| SceneRecord {
                token: s.token,
                name: s.name,
                description: s.description,
                first_sample_token: s.first_sample_token,
                nbr_samples: s.nbr_samples,
            })
            .collect();
        let scene_lookup = scenes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.token.clone(), i))
            .collect();

        let mut samples: HashMap<String, SampleRecord> = raw_samples
            .into_iter()
            .map(|s| {
                let record = SampleRecord {
                    token: s.token.clone(),
                    scene_token: s.scene_token,
                    timestamp: s.timestamp,
                    next: non_empty(s.next),
                    prev: non_empty(s.prev),
                    data: BTreeMap::new(),
                };
                (s.token, record)
            })
            .collect();

        let sensor_channels: HashMap<String, String> = raw_sensors
            .into_iter()
            .map(|s| (s.token, s.channel))
            .collect();

        let mut calibrations = HashMap::with_capacity(raw_calibrations.len());
        for c in raw_calibrations {
            let camera_intrinsic = intrinsic_from_rows(&c.token, &c.camera_intrinsic)?;
            calibrations.insert(
                c.token.clone(),
                CalibratedSensorRecord {
                    token: c.token,
                    sensor_token: c.sensor_token,
                    translation: c.translation,
                    rotation: c.rotation,
                    camera_intrinsic,
                },
            );
        }

        let mut sample_data = HashMap::with_capacity(raw_sample_data.len());
        for sd in raw_sample_data {
            // Keyframe captures populate the per-sample channel map
            if sd.is_key_frame {
                let channel = calibrations
                    .get(&sd.calibrated_sensor_token)
                    .and_then(|c| sensor_channels.get(&c.sensor_token));
                if let (Some(channel), Some(sample)) = (channel, samples.get_mut(&sd.sample_token))
                {
                    sample.data.insert(channel.clone(), sd.token.clone());
                }
            }

            sample_data.insert(
                sd.token.clone(),
                SampleDataRecord {
                    token: sd.token,
                    sample_token: sd.sample_token,
                    ego_pose_token: sd.ego_pose_token,
                    calibrated_sensor_token: sd.calibrated_sensor_token,
                    filename: sd.filename,
                    fileformat: sd.fileformat,
                    width: sd.width,
                    height: sd.height,
                    timestamp: sd.timestamp,
                    is_key_frame: sd.is_key_frame,
                },
            );
        }

        let ego_poses = raw_poses
            .into_iter()
            .map(|p| {
                let record = EgoPoseRecord {
                    token: p.token.clone(),
                    translation: p.translation,
                    rotation: p.rotation,
                    timestamp: p.timestamp,
                };
                (p.token, record)
            })
            .collect();

        let category_names: HashMap<String, String> = raw_categories
            .into_iter()
            .map(|c| (c.token, c.name))
            .collect();
        let instance_categories: HashMap<String, String> = raw_instances
            .into_iter()
            .map(|i| (i.token, i.category_token))
            .collect();

        let mut annotations: HashMap<String, Vec<AnnotationRecord>> = HashMap::new();
        for a in raw_annotations {
            let category_name = instance_categories
                .get(&a.instance_token)
                .and_then(|category| category_names.get(category))
                .cloned()
                .ok_or_else(|| {
                    LogError::invalid(format!(
                        "annotation {} has no resolvable category (instance {})",
                        a.token, a.instance_token
                    ))
                })?;

            annotations
                .entry(a.sample_token.clone())
                .or_default()
                .push(AnnotationRecord {
                    token: a.token,
                    sample_token: a.sample_token,
                    translation: a.translation,
                    size: a.size,
                    rotation: a.rotation,
                    category_name,
                });
        }

        let lidarseg = raw_lidarseg
            .into_iter()
            .map(|l| {
                let record = LidarSegRecord {
                    token: l.token,
                    sample_data_token: l.sample_data_token.clone(),
                    filename: l.filename,
                };
                (l.sample_data_token, record)
            })
            .collect();

        Ok(Self {
            dataroot,
            version: version.to_string(),
            scenes,
            scene_lookup,
            samples,
            sample_data,
            ego_poses,
            calibrations,
            lidarseg,
            annotations,
        })
    }

    /// Dataset root directory.
    pub fn dataroot(&self) -> &Path {
        &self.dataroot
    }

    /// Loaded table version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All scenes in table order.
    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    /// Scene at a table index.
    pub fn scene_at(&self, index: usize) -> Option<&SceneRecord> {
        self.scenes.get(index)
    }

    /// Scene by its human-readable name (e.g. "scene-0061").
    pub fn scene_by_name(&self, name: &str) -> Option<&SceneRecord> {
        self.scenes.iter().find(|s| s.name == name)
    }
}

fn non_empty(link: String) -> Option<String> {
    if link.is_empty() {
        None
    } else {
        Some(link)
    }
}

fn intrinsic_from_rows(token: &str, rows: &[Vec<f64>]) -> Result<Option<[[f64; 3]; 3]>, LogError> {
    if rows.is_empty() {
        return Ok(None);
    }
    if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
        return Err(LogError::invalid(format!(
            "calibrated_sensor {token}: camera_intrinsic must be 3x3"
        )));
    }

    let mut k = [[0.0; 3]; 3];
    for (dst, src) in k.iter_mut().zip(rows) {
        dst.copy_from_slice(src);
    }
    Ok(Some(k))
}

fn load_table<T: DeserializeOwned>(table_dir: &Path, name: &str) -> Result<Vec<T>, LogError> {
    let path = table_dir.join(format!("{name}.json"));
    let text = fs::read_to_string(&path).map_err(|e| LogError::io(path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| LogError::Parse {
        table: name.to_string(),
        message: e.to_string(),
    })
}

fn load_optional_table<T: DeserializeOwned>(
    table_dir: &Path,
    name: &str,
) -> Result<Vec<T>, LogError> {
    if table_dir.join(format!("{name}.json")).exists() {
        load_table(table_dir, name)
    } else {
        Ok(Vec::new())
    }
}

fn lookup<T: Clone>(
    map: &HashMap<String, T>,
    kind: &'static str,
    token: &str,
) -> Result<T, LogError> {
    map.get(token)
        .cloned()
        .ok_or_else(|| LogError::not_found(kind, token))
}

impl SensorLog for NuScenesLog {
    fn scene(&self, token: &str) -> Result<SceneRecord, LogError> {
        self.scene_lookup
            .get(token)
            .map(|&i| self.scenes[i].clone())
            .ok_or_else(|| LogError::not_found("scene", token))
    }

    fn sample(&self, token: &str) -> Result<SampleRecord, LogError> {
        lookup(&self.samples, "sample", token)
    }

    fn sample_data(&self, token: &str) -> Result<SampleDataRecord, LogError> {
        lookup(&self.sample_data, "sample_data", token)
    }

    fn ego_pose(&self, token: &str) -> Result<EgoPoseRecord, LogError> {
        lookup(&self.ego_poses, "ego_pose", token)
    }

    fn calibrated_sensor(&self, token: &str) -> Result<CalibratedSensorRecord, LogError> {
        lookup(&self.calibrations, "calibrated_sensor", token)
    }

    fn lidarseg(&self, sample_data_token: &str) -> Result<Option<LidarSegRecord>, LogError> {
        Ok(self.lidarseg.get(sample_data_token).cloned())
    }

    fn sample_annotations(&self, sample_token: &str) -> Result<Vec<AnnotationRecord>, LogError> {
        Ok(self
            .annotations
            .get(sample_token)
            .cloned()
            .unwrap_or_default())
    }

    fn read_blob(&self, relative_path: &str) -> Result<Vec<u8>, LogError> {
        let path = self.dataroot.join(relative_path);
        fs::read(&path).map_err(|e| LogError::io(path.display(), e))
    }
}
