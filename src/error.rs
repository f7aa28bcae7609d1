//! Error types for the pipeline library.
//!
//! Every stage returns `PipelineError`; the binaries wrap it in `anyhow`
//! for top-level reporting.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error tied to a specific path.
    #[error("IO error on {}: {source}", .path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Download of {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Configuration could not be read or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// External tool could not be started.
    #[error("Tool '{tool}' not found or not executable")]
    ToolNotFound { tool: String },

    /// External tool exited unsuccessfully.
    #[error("Tool '{tool}' exited with {} on input {}", .code.map(|c| format!("code {c}")).unwrap_or_else(|| "a signal".to_string()), .input.display())]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        input: PathBuf,
    },

    /// A required input file is absent.
    #[error("Required input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// A tool reported success but did not produce its output.
    #[error("Tool '{tool}' did not produce {}", .path.display())]
    MissingOutput { tool: String, path: PathBuf },

    /// Boundary feature lacks the name property.
    #[error("Feature #{index} has no string property '{property}'")]
    MissingProperty { index: usize, property: String },

    /// Two subdivision names map to the same file name.
    #[error("Subdivisions '{first}' and '{second}' both map to file '{file}'")]
    NameCollision {
        first: String,
        second: String,
        file: String,
    },

    /// Result directory left over from a previous run.
    #[error("Result directory already exists: {}", .0.display())]
    ResultDirExists(PathBuf),

    /// Result file is not a FeatureCollection.
    #[error("No 'features' array in {}", .0.display())]
    MissingFeatures(PathBuf),

    /// OSM PBF extract could not be read.
    #[error("Failed to read extract {}: {message}", .path.display())]
    Pbf { path: PathBuf, message: String },
}

impl PipelineError {
    /// Attach a path to an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::PathIo {
            path: path.into(),
            source,
        }
    }

    /// Attach a path to a JSON error.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        PipelineError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_display() {
        let err = PipelineError::ToolFailed {
            tool: "osmium".to_string(),
            code: Some(2),
            input: PathBuf::from("Abra.geojson"),
        };
        assert_eq!(
            err.to_string(),
            "Tool 'osmium' exited with code 2 on input Abra.geojson"
        );
    }

    #[test]
    fn test_tool_killed_display() {
        let err = PipelineError::ToolFailed {
            tool: "./gradlew".to_string(),
            code: None,
            input: PathBuf::from("Abra.pbf"),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn test_missing_property_display() {
        let err = PipelineError::MissingProperty {
            index: 3,
            property: "NAME_1".to_string(),
        };
        assert!(err.to_string().contains("#3"));
        assert!(err.to_string().contains("NAME_1"));
    }
}
