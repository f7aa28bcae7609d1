//! Pipeline configuration.
//!
//! Every field has a default that reproduces the Philippines run, so an
//! empty (or absent) config file is valid.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::{PipelineError, Result};

/// GADM level-1 boundaries for the Philippines, simplified.
pub const DEFAULT_SOURCE_URL: &str = "https://raw.githubusercontent.com/stephanietuerk/admin-boundaries/master/lo-res/Admin1_simp10/gadm36_PHL_1.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub workspace: WorkspaceConfig,
    pub tools: ToolsConfig,
    pub split: SplitConfig,
    pub extract: ExtractConfig,
    pub checks: ChecksConfig,
    pub merge: MergeConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// Where the downloaded boundary document is written
    pub boundary_file: PathBuf,
    /// Feature property holding the subdivision name
    pub name_property: String,
    /// Keep an already downloaded boundary file instead of fetching again
    pub reuse_existing: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            boundary_file: PathBuf::from("gadm36_PHL_1.json"),
            name_property: "NAME_1".to_string(),
            reuse_existing: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Base for every relative path below; also the cwd of the checks task
    pub work_dir: PathBuf,
    pub subdivisions_dir: PathBuf,
    pub extracts_dir: PathBuf,
    pub results_dir: PathBuf,
    pub merged_dir: PathBuf,
    pub master_archive: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            subdivisions_dir: PathBuf::from("subdivisions_PHL"),
            extracts_dir: PathBuf::from("extracts"),
            results_dir: PathBuf::from("results"),
            merged_dir: PathBuf::from("merged"),
            master_archive: PathBuf::from("philippines-latest.osm.pbf"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub ogr2ogr: PathBuf,
    pub osmium: PathBuf,
    pub gradle: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ogr2ogr: PathBuf::from("ogr2ogr"),
            osmium: PathBuf::from("osmium"),
            gradle: PathBuf::from("./gradlew"),
        }
    }
}

/// How subdivision files are written
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Converter {
    /// Shell out to ogr2ogr
    #[default]
    Ogr2ogr,
    /// Round coordinates and name the layer in-process
    Native,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SplitConfig {
    pub converter: Converter,
    pub coordinate_precision: u32,
    pub layer_name: String,
    pub skip_failures: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            converter: Converter::Ogr2ogr,
            coordinate_precision: 5,
            layer_name: "subdivision".to_string(),
            skip_failures: true,
        }
    }
}

/// Clip geometry handed to osmium
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractStrategy {
    #[default]
    Polygon,
    Bbox,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractConfig {
    pub strategy: ExtractStrategy,
    /// Replace extracts left by an earlier run
    pub overwrite: bool,
    /// Count OSM objects in every produced extract
    pub inspect: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractStrategy::Polygon,
            overwrite: true,
            inspect: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChecksConfig {
    pub task: String,
    pub sharded: bool,
    /// Extra `-P` project properties
    pub properties: BTreeMap<String, String>,
    pub log_file: String,
    pub output_subdir: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            task: "run".to_string(),
            sharded: false,
            properties: BTreeMap::new(),
            log_file: "output.txt".to_string(),
            output_subdir: "output".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MergeConfig {
    pub delimiter: char,
    /// Also merge `.geojson.gz` result files
    pub include_gzip: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            delimiter: '-',
            include_gzip: true,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.source.url)
            .map_err(|e| PipelineError::Config(format!("source.url '{}': {}", self.source.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PipelineError::Config(format!(
                "source.url must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.source.name_property.is_empty() {
            return Err(PipelineError::Config(
                "source.name_property must not be empty".to_string(),
            ));
        }
        // GeoJSON coordinates are f64; more digits than this are noise
        if self.split.coordinate_precision > 15 {
            return Err(PipelineError::Config(format!(
                "split.coordinate_precision {} is above 15",
                self.split.coordinate_precision
            )));
        }
        Ok(())
    }

    /// Resolve a path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.work_dir.join(path)
        }
    }

    /// Resolve a tool path. Bare names are left for PATH lookup; anything
    /// anything else becomes absolute, independent of the child's cwd.
    pub fn tool(&self, program: &Path) -> PathBuf {
        if program.components().count() > 1 {
            let resolved = self.resolve(program);
            std::path::absolute(&resolved).unwrap_or(resolved)
        } else {
            program.to_path_buf()
        }
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.resolve(&self.source.boundary_file)
    }

    pub fn subdivisions_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.subdivisions_dir)
    }

    pub fn extracts_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.extracts_dir)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.results_dir)
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.merged_dir)
    }

    pub fn master_archive(&self) -> PathBuf {
        self.resolve(&self.workspace.master_archive)
    }
}
