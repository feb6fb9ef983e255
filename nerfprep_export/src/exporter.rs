//! Scene exporter: plan, execute, then write the manifest.

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::execute::execute_plan;
use crate::manifest::{TransformsJson, MANIFEST_FILE};
use crate::plan::plan_scene;
use crate::sink::ArtifactSink;
use nerfprep_core::MaskDiagnostics;
use nerfprep_env::SensorLog;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Summary of a successful export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportReport {
    pub scene_name: String,
    pub frames: usize,
    pub masks_written: usize,
    pub depth_written: usize,
    /// Mask counters summed over all frames
    pub mask_diagnostics: MaskDiagnostics,
    pub depth_saturated_pixels: usize,
    /// Manifest path relative to the sink root
    pub manifest_path: String,
}

/// Exports one scene into `sink`.
///
/// Any existing manifest is removed before the first artifact is written.
/// The new one is written last, and only if every frame succeeded; a failed
/// export leaves no `transforms.json` behind.
///
/// # Arguments
/// * `log` - Sensor log to read from
/// * `scene_token` - Scene to export
/// * `config` - Channels, mask mode, depth and execution options
/// * `sink` - Destination for images, masks, depth maps and the manifest
pub fn export_scene<L, S>(
    log: &L,
    scene_token: &str,
    config: &ExportConfig,
    sink: &S,
) -> Result<ExportReport, ExportError>
where
    L: SensorLog + ?Sized,
    S: ArtifactSink + ?Sized,
{
    let plan = plan_scene(log, scene_token, config)?;
    info!(
        "Planned {} frames for {} ({}x{})",
        plan.len(),
        plan.scene.name,
        plan.intrinsics.width,
        plan.intrinsics.height
    );

    // A manifest from an earlier run must not describe this run's artifacts
    sink.remove(MANIFEST_FILE)?;
    let outcomes = execute_plan(log, &plan, config, sink)?;

    let manifest = TransformsJson::from_plan(&plan);
    sink.write_atomic(MANIFEST_FILE, &manifest.to_json()?)?;

    let mut report = ExportReport {
        scene_name: plan.scene.name.clone(),
        frames: plan.len(),
        manifest_path: MANIFEST_FILE.to_string(),
        ..ExportReport::default()
    };
    for outcome in &outcomes {
        if let Some(diagnostics) = outcome.mask {
            report.masks_written += 1;
            report.mask_diagnostics += diagnostics;
        }
        if let Some(stats) = outcome.depth {
            report.depth_written += 1;
            report.depth_saturated_pixels += stats.saturated;
        }
    }

    info!(
        "Exported {} frames ({} masks, {} depth maps) for {}",
        report.frames, report.masks_written, report.depth_written, report.scene_name
    );
    Ok(report)
}
