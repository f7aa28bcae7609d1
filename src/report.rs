//! Machine-readable summary of a pipeline run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checks::CheckRun;
use crate::error::{PipelineError, Result};
use crate::extract::RegionExtract;
use crate::merge::MergeSummary;
use crate::split::SplitSummary;

pub const REPORT_FILE: &str = "run-report.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub source_url: String,
    pub split: SplitSummary,
    pub extracts: Vec<RegionExtract>,
    pub check_runs: Vec<CheckRun>,
    pub merge: MergeSummary,
}

impl RunReport {
    pub fn start(source_url: &str) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            source_url: source_url.to_string(),
            split: SplitSummary::default(),
            extracts: Vec::new(),
            check_runs: Vec::new(),
            merge: MergeSummary::default(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| PipelineError::json(path, e))?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::Subdivision;
    use std::path::PathBuf;

    #[test]
    fn test_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE);

        let mut report = RunReport::start("https://example.com/gadm.json");
        report.split.subdivisions.push(Subdivision {
            name: "Abra".to_string(),
            path: PathBuf::from("subdivisions_PHL/Abra.geojson"),
            features: 1,
        });
        report.finish();
        report.write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["source_url"], "https://example.com/gadm.json");
        assert_eq!(value["split"]["subdivisions"][0]["name"], "Abra");
        assert!(value["finished_at"].is_string());
        assert!(value["extracts"].as_array().unwrap().is_empty());
    }
}
