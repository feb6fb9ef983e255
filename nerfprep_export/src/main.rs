//! nerfprep CLI
//!
//! Export nuScenes scenes as Nerfstudio datasets, or rank scenes by ego speed.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use nerfprep_core::{CategoryClassifier, ClassId, DepthSettings, DynamicClasses};
use nerfprep_env::NuScenesLog;
use nerfprep_export::config::{DEFAULT_BBOX_DILATION, DEFAULT_LIDAR_DILATION};
use nerfprep_export::{
    export_scene, rank_scenes, ExportConfig, FsSink, IntrinsicsPolicy, MaskMode,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// nuScenes to Nerfstudio exporter
#[derive(Parser, Debug)]
#[command(name = "nerfprep")]
#[command(about = "Export nuScenes scenes as Nerfstudio datasets", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export one scene
    Export(ExportArgs),
    /// Print ego speed statistics for every scene, slowest first
    Analyze(DatasetArgs),
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// nuScenes data root
    #[arg(long, default_value = "data/raw")]
    dataroot: PathBuf,

    /// Dataset version (metadata subdirectory)
    #[arg(long = "version", default_value = "v1.0-mini")]
    dataset_version: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MaskKind {
    None,
    Lidar,
    Bbox,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    /// Scene index in the scene table
    #[arg(long, conflicts_with = "scene_name")]
    scene_index: Option<usize>,

    /// Scene name (e.g. scene-0061)
    #[arg(long)]
    scene_name: Option<String>,

    /// Output directory for the scene
    #[arg(short, long)]
    output: PathBuf,

    /// Dynamic-object mask source
    #[arg(long, value_enum, default_value = "none")]
    mask: MaskKind,

    /// Also export sparse LiDAR depth maps
    #[arg(long)]
    depth: bool,

    /// Mask dilation kernel size (default 8 for lidar, 5 for bbox)
    #[arg(long)]
    dilation: Option<u32>,

    /// Dynamic semantic class IDs for lidar masks and depth filtering
    #[arg(long, value_delimiter = ',')]
    dynamic_classes: Option<Vec<ClassId>>,

    /// Dynamic category prefixes for bbox masks (e.g. vehicle.,human.)
    #[arg(long, value_delimiter = ',')]
    dynamic_categories: Option<Vec<String>>,

    /// Accepted depth range in metres
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    depth_range: Option<Vec<f64>>,

    /// Fail if camera intrinsics change within the scene
    #[arg(long)]
    strict_intrinsics: bool,

    /// Process frames in parallel
    #[arg(long)]
    parallel: bool,
}

impl ExportArgs {
    fn dynamic_classes(&self) -> DynamicClasses {
        match &self.dynamic_classes {
            Some(ids) => DynamicClasses::from_ids(ids.iter().copied()),
            None => DynamicClasses::default(),
        }
    }

    fn config(&self) -> Result<ExportConfig> {
        let mask = match self.mask {
            MaskKind::None => MaskMode::None,
            MaskKind::Lidar => MaskMode::Lidar {
                dynamic_classes: self.dynamic_classes(),
                dilation: self.dilation.unwrap_or(DEFAULT_LIDAR_DILATION),
            },
            MaskKind::Bbox => MaskMode::BoundingBox {
                classifier: match &self.dynamic_categories {
                    Some(prefixes) => CategoryClassifier::with_dynamic_prefixes(prefixes.iter().cloned()),
                    None => CategoryClassifier::default(),
                },
                dilation: self.dilation.unwrap_or(DEFAULT_BBOX_DILATION),
            },
        };

        let depth = if self.depth {
            let mut settings = DepthSettings {
                dynamic_classes: self.dynamic_classes(),
                ..DepthSettings::default()
            };
            if let Some(range) = &self.depth_range {
                let (min, max) = (range[0], range[1]);
                if !(min >= 0.0 && min < max) {
                    bail!("Invalid depth range {min}..{max}");
                }
                settings.min_depth = min;
                settings.max_depth = max;
            }
            Some(settings)
        } else {
            None
        };

        Ok(ExportConfig {
            mask,
            depth,
            intrinsics_policy: if self.strict_intrinsics {
                IntrinsicsPolicy::Verify
            } else {
                IntrinsicsPolicy::FirstFrame
            },
            parallel: self.parallel,
            ..ExportConfig::default()
        })
    }
}

fn open_log(dataset: &DatasetArgs) -> Result<NuScenesLog> {
    NuScenesLog::open(&dataset.dataroot, &dataset.dataset_version).with_context(|| {
        format!(
            "Failed to open {} at {}",
            dataset.dataset_version,
            dataset.dataroot.display()
        )
    })
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let config = args.config()?;
    let log = open_log(&args.dataset)?;

    let scene = match (&args.scene_name, args.scene_index) {
        (Some(name), _) => log
            .scene_by_name(name)
            .ok_or_else(|| anyhow!("No scene named {name}"))?,
        (None, index) => {
            let index = index.unwrap_or(0);
            log.scene_at(index)
                .ok_or_else(|| anyhow!("Scene index {index} out of range ({} scenes)", log.scenes().len()))?
        }
    };
    info!("Exporting {} ({})", scene.name, scene.description);

    let sink = FsSink::new(&args.output);
    let report = export_scene(&log, &scene.token, &config, &sink)
        .with_context(|| format!("Export of {} failed", scene.name))?;

    let diagnostics = &report.mask_diagnostics;
    if report.masks_written > 0 {
        info!(
            "Masks: {} evidence, {} drawn, {} behind camera, {} out of view, {} hull fallbacks",
            diagnostics.evidence,
            diagnostics.drawn,
            diagnostics.behind_camera,
            diagnostics.out_of_view,
            diagnostics.hull_fallbacks
        );
    }
    if report.depth_saturated_pixels > 0 {
        info!("Depth: {} pixels beyond 65.535 m left empty", report.depth_saturated_pixels);
    }
    info!(
        "Wrote {}",
        args.output.join(&report.manifest_path).display()
    );
    Ok(())
}

fn run_analyze(args: &DatasetArgs) -> Result<()> {
    let log = open_log(args)?;
    let tokens: Vec<String> = log.scenes().iter().map(|s| s.token.clone()).collect();
    let results = rank_scenes(&log, &tokens, &ExportConfig::default().camera_channel)?;

    println!("{:<15} {:<8} {:<18} {:<12}", "Scene", "Frames", "Avg Speed (km/h)", "Stop Ratio");
    println!("{}", "-".repeat(60));
    for r in &results {
        println!(
            "{:<15} {:<8} {:>10.1}        {:>8.1}%",
            r.scene_name,
            r.frames,
            r.mean_speed_kmh(),
            r.stop_ratio * 100.0
        );
    }
    if let Some(slowest) = results.first() {
        info!(
            "Slowest scene: {} ({:.1} km/h)",
            slowest.scene_name,
            slowest.mean_speed_kmh()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match &cli.command {
        Command::Export(args) => run_export(args),
        Command::Analyze(args) => run_analyze(args),
    }
}
