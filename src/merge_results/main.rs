//! Merge per-run result GeoJSON files without running the rest of the sweep.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use atlas_sweep::config::MergeConfig;
use atlas_sweep::merge::merge_results;

#[derive(Parser, Debug)]
#[command(name = "merge-results")]
#[command(about = "Merge result GeoJSON files by file name prefix")]
struct Args {
    /// Root of the result directory tree
    input: PathBuf,

    /// Destination folder for merged files
    output: PathBuf,

    /// Grouping key ends at the first occurrence of this character
    #[arg(long, default_value_t = '-')]
    delimiter: char,

    /// Ignore .geojson.gz result files
    #[arg(long)]
    no_gzip: bool,
}

fn main() -> Result<()> {
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

    let config = MergeConfig {
        delimiter: args.delimiter,
        include_gzip: !args.no_gzip,
    };

    let summary = merge_results(&args.input, &args.output, &config)
        .with_context(|| format!("Failed to merge {}", args.input.display()))?;

    info!(
        "Merged {} features into {} files",
        summary.total_features(),
        summary.groups.len()
    );

    println!("Done!");
    Ok(())
}
