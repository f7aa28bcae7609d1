//! Split the boundary document into one GeoJSON file per subdivision.
//!
//! Features are grouped by exact name in-process; the converter only
//! ever sees an already-filtered file, so no filter expression is built
//! from a subdivision name.

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::Serialize;
use tempfile::Builder;
use tracing::{debug, info};

use crate::config::{Config, Converter};
use crate::error::{PipelineError, Result};
use crate::models::{round_coordinates, Feature, FeatureCollection};
use crate::tools::{ToolInvocation, ToolRunner};

/// One written subdivision file
#[derive(Debug, Clone, Serialize)]
pub struct Subdivision {
    pub name: String,
    pub path: PathBuf,
    pub features: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitSummary {
    pub subdivisions: Vec<Subdivision>,
}

/// Make a subdivision name safe to use as a file stem
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

pub fn subdivision_file_name(name: &str) -> String {
    format!("{}.geojson", sanitize_name(name))
}

/// Group features by the string value of `property`, in order of first
/// appearance. An empty name counts as missing.
pub fn group_by_name(
    collection: &FeatureCollection,
    property: &str,
) -> Result<Vec<(String, Vec<Feature>)>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Feature>)> = Vec::new();

    for (i, feature) in collection.features.iter().enumerate() {
        let name = feature
            .property_str(property)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PipelineError::MissingProperty {
                index: i,
                property: property.to_string(),
            })?;

        match index.get(name) {
            Some(&slot) => groups[slot].1.push(feature.clone()),
            None => {
                index.insert(name, groups.len());
                groups.push((name.to_string(), vec![feature.clone()]));
            }
        }
    }

    Ok(groups)
}

fn check_collisions(groups: &[(String, Vec<Feature>)]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (name, _) in groups {
        let file = subdivision_file_name(name);
        if let Some(first) = seen.get(&file) {
            return Err(PipelineError::NameCollision {
                first: first.to_string(),
                second: name.clone(),
                file,
            });
        }
        seen.insert(file, name);
    }
    Ok(())
}

/// Split `input` into `<output_dir>/<name>.geojson` files.
pub fn split_boundaries<R: ToolRunner>(
    input: &Path,
    output_dir: &Path,
    config: &Config,
    runner: &R,
) -> Result<SplitSummary> {
    let source = FeatureCollection::read_from(input)?;
    let property = &config.source.name_property;
    let groups = group_by_name(&source, property)?;
    check_collisions(&groups)?;

    info!(
        "Splitting {} features into {} subdivisions by '{}'",
        source.len(),
        groups.len(),
        property
    );

    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;
    let staging = Builder::new()
        .prefix("atlas-split-")
        .tempdir()
        .map_err(PipelineError::Io)?;

    let mut summary = SplitSummary::default();

    for (name, features) in groups {
        let file_name = subdivision_file_name(&name);
        let path = output_dir.join(&file_name);
        let count = features.len();

        let mut group = FeatureCollection::new(features);
        group.crs = source.crs.clone();

        match config.split.converter {
            Converter::Native => {
                group.name = Some(config.split.layer_name.clone());
                for geometry in group.features.iter_mut().filter_map(|f| f.geometry.as_mut()) {
                    round_coordinates(geometry, config.split.coordinate_precision);
                }
                group.write_to(&path)?;
            }
            Converter::Ogr2ogr => {
                let staged = staging.path().join(&file_name);
                group.write_to(&staged)?;

                // The GeoJSON driver refuses to write over an existing file
                if path.exists() {
                    fs::remove_file(&path).map_err(|e| PipelineError::io(&path, e))?;
                }

                runner.run(&ogr2ogr_invocation(config, input, &staged, &path))?;
            }
        }

        debug!("{} -> {} ({} features)", name, path.display(), count);
        summary.subdivisions.push(Subdivision {
            name,
            path,
            features: count,
        });
    }

    info!(
        "Wrote {} subdivision files to {}",
        summary.subdivisions.len(),
        output_dir.display()
    );

    Ok(summary)
}

/// `source` is the boundary document, reported on failure; `staged` is
/// the temporary file actually converted.
fn ogr2ogr_invocation(
    config: &Config,
    source: &Path,
    staged: &Path,
    destination: &Path,
) -> ToolInvocation {
    let split = &config.split;
    let mut inv = ToolInvocation::new(config.tool(&config.tools.ogr2ogr), source)
        .args(["-f", "GeoJSON", "-lco"])
        .arg(format!("COORDINATE_PRECISION={}", split.coordinate_precision))
        .arg("-nln")
        .arg(&split.layer_name);

    if split.skip_failures {
        inv = inv.arg("-skipfailures");
    }

    inv.arg(destination).arg(staged)
}
