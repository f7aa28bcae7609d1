//! Merge per-run result GeoJSON files into one file per subdivision.
//!
//! Files are grouped by the part of their stem before the first
//! delimiter, so `Abra-run1.geojson` and `Abra-run2.geojson` both land in
//! `Abra.geojson`. The walk is sorted by file name at every level, which
//! makes the output deterministic for a given tree; feature order within a
//! merged file follows that walk and carries no meaning.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::MergeConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Feature, FeatureCollection};

const GEOJSON_SUFFIX: &str = ".geojson";
const GZIP_SUFFIX: &str = ".geojson.gz";

/// One written merged file
#[derive(Debug, Clone, Serialize)]
pub struct MergedGroup {
    pub key: String,
    pub sources: Vec<PathBuf>,
    pub features: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeSummary {
    pub groups: Vec<MergedGroup>,
}

impl MergeSummary {
    pub fn total_features(&self) -> usize {
        self.groups.iter().map(|g| g.features).sum()
    }
}

#[derive(Deserialize)]
struct ResultFile {
    #[serde(default)]
    features: Option<Vec<Feature>>,
}

/// Grouping key: the stem up to the first `delimiter`, or the whole stem
pub fn grouping_key(stem: &str, delimiter: char) -> &str {
    stem.split_once(delimiter).map_or(stem, |(key, _)| key)
}

/// Stem of a result file name and whether it is gzip-compressed
fn result_stem(file_name: &str, include_gzip: bool) -> Option<(&str, bool)> {
    if let Some(stem) = file_name.strip_suffix(GEOJSON_SUFFIX) {
        return Some((stem, false));
    }
    if include_gzip {
        if let Some(stem) = file_name.strip_suffix(GZIP_SUFFIX) {
            return Some((stem, true));
        }
    }
    None
}

fn read_features(path: &Path, compressed: bool) -> Result<Vec<Feature>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader: Box<dyn Read> = if compressed {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let parsed: ResultFile =
        serde_json::from_reader(BufReader::new(reader)).map_err(|e| PipelineError::json(path, e))?;
    parsed
        .features
        .ok_or_else(|| PipelineError::MissingFeatures(path.to_path_buf()))
}

/// Walk `input`, group result files by key and write `<key>.geojson`
/// into `output_dir`. An empty tree writes nothing.
pub fn merge_results(input: &Path, output_dir: &Path, config: &MergeConfig) -> Result<MergeSummary> {
    info!("Merging GeoJSON files under {}", input.display());

    let mut groups: BTreeMap<String, (Vec<PathBuf>, Vec<Feature>)> = BTreeMap::new();

    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::io(input, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some((stem, compressed)) = result_stem(&file_name, config.include_gzip) else {
            continue;
        };

        let key = grouping_key(stem, config.delimiter);
        if key.is_empty() {
            warn!("Skipping {}: empty grouping key", entry.path().display());
            continue;
        }

        let features = read_features(entry.path(), compressed)?;
        debug!(
            "{} -> {} ({} features)",
            entry.path().display(),
            key,
            features.len()
        );

        let (sources, merged) = groups.entry(key.to_string()).or_default();
        sources.push(entry.path().to_path_buf());
        merged.extend(features);
    }

    let mut summary = MergeSummary::default();
    if groups.is_empty() {
        info!("No result files found");
        return Ok(summary);
    }

    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;

    for (key, (sources, features)) in groups {
        let path = output_dir.join(format!("{}{}", key, GEOJSON_SUFFIX));
        let collection = FeatureCollection::new(features);
        collection.write_to(&path)?;

        info!(
            "Wrote {} ({} features from {} files)",
            path.display(),
            collection.len(),
            sources.len()
        );
        summary.groups.push(MergedGroup {
            key,
            sources,
            features: collection.len(),
            path,
        });
    }

    Ok(summary)
}
