//! Run the Atlas Checks Gradle task against every region extract.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::extract::RegionExtract;
use crate::tools::{ToolInvocation, ToolRunner};

/// A completed checks run
#[derive(Debug, Clone, Serialize)]
pub struct CheckRun {
    pub name: String,
    pub extract: PathBuf,
    pub result_dir: PathBuf,
    pub log: PathBuf,
}

/// Result directory name for an extract: its file stem
fn result_dir_name(extract: &Path) -> String {
    extract
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Create a fresh result directory. A leftover one from an earlier run
/// stops the pipeline.
fn create_result_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(PipelineError::ResultDirExists(path.to_path_buf()))
        }
        Err(e) => Err(PipelineError::io(path, e)),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| PipelineError::io(path, e))
}

fn checks_invocation(config: &Config, extract: &Path, result_dir: &Path) -> Result<ToolInvocation> {
    let checks = &config.checks;
    let output_dir = absolute(result_dir)?.join(&checks.output_subdir);
    let output_url = Url::from_directory_path(&output_dir).map_err(|_| {
        PipelineError::Config(format!(
            "cannot express {} as a file URL",
            output_dir.display()
        ))
    })?;

    let mut input_arg = std::ffi::OsString::from("-Pchecks.local.input=");
    input_arg.push(absolute(extract)?);

    let mut inv = ToolInvocation::new(config.tool(&config.tools.gradle), extract)
        .arg(&checks.task)
        .arg(format!("-Pchecks.local.sharded={}", checks.sharded))
        .arg(input_arg)
        .arg(format!("-Pchecks.local.output={}", output_url));

    for (key, value) in &checks.properties {
        inv = inv.arg(format!("-P{}={}", key, value));
    }

    Ok(inv
        .current_dir(&config.workspace.work_dir)
        .log_to(result_dir.join(&checks.log_file)))
}

/// Run the checks task once per extract, sequentially. Each run blocks
/// until the task exits.
pub fn run_checks<R: ToolRunner>(
    extracts: &[RegionExtract],
    config: &Config,
    runner: &R,
) -> Result<Vec<CheckRun>> {
    let results_root = config.results_dir();
    fs::create_dir_all(&results_root).map_err(|e| PipelineError::io(&results_root, e))?;

    let pb = ProgressBar::new(extracts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut runs = Vec::with_capacity(extracts.len());

    for extract in extracts {
        let name = result_dir_name(&extract.path);
        let result_dir = results_root.join(&name);
        create_result_dir(&result_dir)?;

        let invocation = checks_invocation(config, &extract.path, &result_dir)?;
        pb.set_message(name.clone());
        info!("Running checks for {}", name);

        runner.run(&invocation)?;
        pb.inc(1);

        runs.push(CheckRun {
            name,
            extract: extract.path.clone(),
            result_dir,
            log: invocation.log_file.unwrap_or_default(),
        });
    }

    pb.finish_with_message("checks complete");
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RecordingRunner;

    fn extract(config: &Config, name: &str) -> RegionExtract {
        RegionExtract {
            name: name.to_string(),
            boundary: config.subdivisions_dir().join(format!("{}.geojson", name)),
            path: config.extracts_dir().join(format!("{}.pbf", name)),
            objects: None,
        }
    }

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.workspace.work_dir = dir.to_path_buf();
        config.workspace.results_dir = PathBuf::from("results");
        config
    }

    #[test]
    fn test_gradle_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = RecordingRunner::new();

        let runs = run_checks(&[extract(&config, "Abra")], &config, &runner).unwrap();
        let result_dir = config.results_dir().join("Abra");
        assert_eq!(runs[0].result_dir, result_dir);
        assert!(result_dir.is_dir());

        let call = &runner.calls()[0];
        let args: Vec<String> = call
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "run");
        assert_eq!(args[1], "-Pchecks.local.sharded=false");
        assert!(args[2].starts_with("-Pchecks.local.input="));
        assert!(args[2].ends_with("Abra.pbf"));
        assert!(args[3].starts_with("-Pchecks.local.output=file:///"));
        assert!(args[3].ends_with("/results/Abra/output/"));

        assert_eq!(call.current_dir.as_deref(), Some(dir.path()));
        assert_eq!(call.log_file, Some(result_dir.join("output.txt")));
        assert_eq!(call.program, dir.path().join("./gradlew"));
    }

    #[test]
    fn test_extra_properties() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config
            .checks
            .properties
            .insert("checks.local.countries".to_string(), "PHL".to_string());
        let runner = RecordingRunner::new();

        run_checks(&[extract(&config, "Abra")], &config, &runner).unwrap();

        let call = &runner.calls()[0];
        assert_eq!(
            call.args.last().map(|a| a.to_string_lossy().into_owned()),
            Some("-Pchecks.local.countries=PHL".to_string())
        );
    }

    #[test]
    fn test_existing_result_dir_halts_before_task() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(config.results_dir().join("Benguet")).unwrap();
        let runner = RecordingRunner::new();

        let extracts = [extract(&config, "Abra"), extract(&config, "Benguet")];
        let err = run_checks(&extracts, &config, &runner).unwrap_err();

        assert!(matches!(err, PipelineError::ResultDirExists(_)));
        assert_eq!(runner.call_count(), 1);
        assert_eq!(runner.calls()[0].input, extracts[0].path);
    }

    #[test]
    fn test_task_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = RecordingRunner::failing(1);

        let err = run_checks(&[extract(&config, "Abra")], &config, &runner).unwrap_err();
        assert!(matches!(err, PipelineError::ToolFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_wrapper_found_under_relative_work_dir() {
        use crate::tools::SystemToolRunner;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::Builder::new()
            .prefix("checks-wd-")
            .tempdir_in(".")
            .unwrap();
        let wrapper = dir.path().join("gradlew");
        fs::write(&wrapper, "#!/bin/sh\necho \"task $1 in $(pwd)\"\n").unwrap();
        fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.workspace.work_dir = PathBuf::from(dir.path().file_name().unwrap());
        assert!(config.workspace.work_dir.is_relative());

        let runs = run_checks(&[extract(&config, "Abra")], &config, &SystemToolRunner).unwrap();

        let log = fs::read_to_string(&runs[0].log).unwrap();
        assert!(log.starts_with("task run in "), "unexpected log: {log}");
        assert!(log.trim_end().ends_with(&*config.workspace.work_dir.to_string_lossy()));
    }
}
