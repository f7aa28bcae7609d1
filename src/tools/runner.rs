use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{PipelineError, Result};

/// One blocking run of an external program
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    /// Receives both stdout and stderr when set
    pub log_file: Option<PathBuf>,
    /// The file being processed, reported on failure
    pub input: PathBuf,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>, input: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            log_file: None,
            input: input.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn tool_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Value following `flag` in the argument list
    pub fn arg_after(&self, flag: &str) -> Option<&OsString> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
    }

    /// Space-joined command line, for logs only
    pub fn command_line(&self) -> String {
        let mut line = self.tool_name();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

pub trait ToolRunner {
    /// Run to completion. A non-zero exit is an error.
    fn run(&self, invocation: &ToolInvocation) -> Result<()>;
}

/// Runs tools as child processes and waits for them
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);

        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        if let Some(log) = &invocation.log_file {
            let stdout = File::create(log).map_err(|e| PipelineError::io(log, e))?;
            let stderr = stdout.try_clone().map_err(|e| PipelineError::io(log, e))?;
            command
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(stderr));
        }

        debug!("Running: {}", invocation.command_line());

        let status = command.status().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                PipelineError::ToolNotFound {
                    tool: invocation.tool_name(),
                }
            }
            _ => PipelineError::Io(e),
        })?;

        if !status.success() {
            return Err(PipelineError::ToolFailed {
                tool: invocation.tool_name(),
                code: status.code(),
                input: invocation.input.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_arg_lookup() {
        let inv = ToolInvocation::new("osmium", "Abra.geojson")
            .arg("extract")
            .args(["-p", "Abra.geojson", "philippines-latest.osm.pbf"])
            .args(["-o", "Abra.pbf"]);

        assert_eq!(inv.arg_after("-o"), Some(&OsString::from("Abra.pbf")));
        assert_eq!(inv.arg_after("--overwrite"), None);
        assert_eq!(
            inv.command_line(),
            "osmium extract -p Abra.geojson philippines-latest.osm.pbf -o Abra.pbf"
        );
    }

    #[test]
    fn test_missing_program_is_tool_not_found() {
        let inv = ToolInvocation::new("definitely-not-a-real-tool-7f3a", "x");
        let err = SystemToolRunner.run(&inv).unwrap_err();
        assert!(matches!(err, PipelineError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_checked() {
        let inv = ToolInvocation::new("sh", "input.pbf").args(["-c", "exit 3"]);
        match SystemToolRunner.run(&inv).unwrap_err() {
            PipelineError::ToolFailed { tool, code, input } => {
                assert_eq!(tool, "sh");
                assert_eq!(code, Some(3));
                assert_eq!(input, PathBuf::from("input.pbf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_log_file_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output.txt");
        let inv = ToolInvocation::new("sh", "x")
            .args(["-c", "echo out; echo err 1>&2"])
            .log_to(&log);

        SystemToolRunner.run(&inv).unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("out"));
        assert!(content.contains("err"));
    }
}
