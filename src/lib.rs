//! atlas-sweep - run Atlas Checks per administrative subdivision.
//!
//! This library provides the pipeline stages used by the `sweep` and
//! `merge-results` binaries: download boundaries, split them per
//! subdivision, extract OSM regions, run the checks task and merge the
//! per-run results.

pub mod checks;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod inspect;
pub mod merge;
pub mod models;
pub mod report;
pub mod split;
pub mod tools;

pub use config::Config;
pub use error::{PipelineError, Result};
