//! Carve one OSM extract per subdivision out of the master archive.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, ExtractStrategy};
use crate::error::{PipelineError, Result};
use crate::inspect::{count_objects, ObjectCounts};
use crate::models::{BoundingBox, FeatureCollection};
use crate::tools::{ToolInvocation, ToolRunner};

/// A produced region extract
#[derive(Debug, Clone, Serialize)]
pub struct RegionExtract {
    /// Subdivision file stem
    pub name: String,
    /// Subdivision GeoJSON used as clip boundary
    pub boundary: PathBuf,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<ObjectCounts>,
}

/// `.geojson` files directly inside `dir`, sorted by file name
pub fn list_subdivision_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "geojson") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run the extraction tool once per subdivision file in `subdivisions_dir`
pub fn extract_regions<R: ToolRunner>(
    subdivisions_dir: &Path,
    config: &Config,
    runner: &R,
) -> Result<Vec<RegionExtract>> {
    let master = config.master_archive();
    if !master.exists() {
        return Err(PipelineError::MissingInput(master));
    }

    let boundaries = list_subdivision_files(subdivisions_dir)?;
    let extracts_dir = config.extracts_dir();
    fs::create_dir_all(&extracts_dir).map_err(|e| PipelineError::io(&extracts_dir, e))?;

    info!(
        "Extracting {} regions from {}",
        boundaries.len(),
        master.display()
    );

    let mut extracts = Vec::with_capacity(boundaries.len());

    for boundary in boundaries {
        let name = boundary
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = extracts_dir.join(format!("{}.pbf", name));

        let invocation = osmium_invocation(config, &boundary, &master, &output)?;
        runner.run(&invocation)?;

        if !output.exists() {
            return Err(PipelineError::MissingOutput {
                tool: invocation.tool_name(),
                path: output,
            });
        }

        let objects = if config.extract.inspect {
            let counts = count_objects(&output)?;
            info!(
                "{}: {} nodes, {} ways, {} relations",
                name, counts.nodes, counts.ways, counts.relations
            );
            Some(counts)
        } else {
            None
        };

        info!("Extracted {} -> {}", name, output.display());
        extracts.push(RegionExtract {
            name,
            boundary,
            path: output,
            objects,
        });
    }

    Ok(extracts)
}

fn osmium_invocation(
    config: &Config,
    boundary: &Path,
    master: &Path,
    output: &Path,
) -> Result<ToolInvocation> {
    let mut inv = ToolInvocation::new(config.tool(&config.tools.osmium), boundary).arg("extract");

    inv = match config.extract.strategy {
        ExtractStrategy::Polygon => inv.arg("-p").arg(boundary),
        ExtractStrategy::Bbox => {
            let features = FeatureCollection::read_from(boundary)?.features;
            match BoundingBox::of_features(&features) {
                Some(bbox) => inv.arg("-b").arg(bbox.to_osmium_arg()),
                None => {
                    warn!(
                        "No polygon in {}, clipping with the boundary file instead",
                        boundary.display()
                    );
                    inv.arg("-p").arg(boundary)
                }
            }
        }
    };

    inv = inv.arg(master).arg("-o").arg(output);
    if config.extract.overwrite {
        inv = inv.arg("--overwrite");
    }

    Ok(inv)
}
