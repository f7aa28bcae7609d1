//! Full Atlas Checks sweep.
//!
//! Downloads the boundary document, splits it per subdivision, extracts
//! each region from the master OSM archive, runs the checks task on every
//! extract and merges the per-run results.

mod prompt;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use atlas_sweep::checks::run_checks;
use atlas_sweep::extract::extract_regions;
use atlas_sweep::fetch::fetch_boundaries;
use atlas_sweep::merge::merge_results;
use atlas_sweep::report::{RunReport, REPORT_FILE};
use atlas_sweep::split::split_boundaries;
use atlas_sweep::tools::SystemToolRunner;
use atlas_sweep::Config;

#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(about = "Run Atlas Checks per administrative subdivision")]
struct Args {
    /// Pipeline config file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder of subdivision GeoJSON files to extract (prompted if absent)
    #[arg(long)]
    subdivisions_dir: Option<PathBuf>,

    /// Folder holding the per-run result GeoJSON files (prompted if absent)
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Destination for merged GeoJSON files (prompted if absent)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Reuse an already downloaded boundary file
    #[arg(long)]
    skip_download: bool,
}

fn folder_arg(arg: Option<PathBuf>, question: &str, default: &Path) -> Result<PathBuf> {
    match arg {
        Some(dir) => Ok(dir),
        None => prompt::folder(question, default),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    info!("atlas-sweep pipeline");
    info!("Working directory: {}", config.workspace.work_dir.display());

    let runner = SystemToolRunner;
    let mut report = RunReport::start(&config.source.url);

    let boundary = fetch_boundaries(&config, args.skip_download || config.source.reuse_existing)
        .await
        .context("Failed to download boundary document")?;

    report.split = split_boundaries(&boundary, &config.subdivisions_dir(), &config, &runner)
        .context("Failed to split boundary document")?;

    let subdivisions_dir = folder_arg(
        args.subdivisions_dir,
        "Enter the input folder containing the subdivisions GeoJSON files",
        &config.subdivisions_dir(),
    )?;
    report.extracts =
        extract_regions(&subdivisions_dir, &config, &runner).context("Failed to extract regions")?;
    report.check_runs =
        run_checks(&report.extracts, &config, &runner).context("Failed to run checks")?;

    let results_dir = folder_arg(
        args.results_dir,
        "Enter the folder path containing the resulting GeoJSON files",
        &config.results_dir(),
    )?;
    let output_dir = folder_arg(
        args.output_dir,
        "Enter the output folder path for merged GeoJSON files",
        &config.merged_dir(),
    )?;
    report.merge = merge_results(&results_dir, &output_dir, &config.merge)
        .context("Failed to merge results")?;

    info!(
        "Merged {} features into {} files",
        report.merge.total_features(),
        report.merge.groups.len()
    );

    report.finish();
    let report_path = config.resolve(Path::new(REPORT_FILE));
    report
        .write_to(&report_path)
        .context("Failed to write run report")?;
    info!("Run report written to {}", report_path.display());

    println!("Done!");
    Ok(())
}
