//! Test double for [`ToolRunner`].

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use super::runner::{ToolInvocation, ToolRunner};
use crate::error::{PipelineError, Result};

type Effect = Box<dyn Fn(&ToolInvocation) -> Result<()>>;

/// Records every invocation instead of spawning a process. An optional
/// effect simulates what the real tool would leave on disk.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<ToolInvocation>>,
    effect: Option<Effect>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect<F>(effect: F) -> Self
    where
        F: Fn(&ToolInvocation) -> Result<()> + 'static,
    {
        Self {
            calls: RefCell::new(Vec::new()),
            effect: Some(Box::new(effect)),
        }
    }

    /// Acts like ogr2ogr: copies the trailing source argument to the
    /// destination argument just before it.
    pub fn copying_converter() -> Self {
        Self::with_effect(|inv| {
            let [.., dst, src] = inv.args.as_slice() else {
                return Ok(());
            };
            fs::copy(src, dst).map_err(|e| PipelineError::io(PathBuf::from(dst), e))?;
            Ok(())
        })
    }

    /// Creates an empty file at the argument following `-o`
    pub fn touching_output() -> Self {
        Self::with_effect(|inv| {
            if let Some(out) = inv.arg_after("-o") {
                fs::write(out, b"").map_err(|e| PipelineError::io(PathBuf::from(out), e))?;
            }
            Ok(())
        })
    }

    /// Fails every invocation with the given exit code
    pub fn failing(code: i32) -> Self {
        Self::with_effect(move |inv| {
            Err(PipelineError::ToolFailed {
                tool: inv.tool_name(),
                code: Some(code),
                input: inv.input.clone(),
            })
        })
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        self.calls.borrow_mut().push(invocation.clone());
        match &self.effect {
            Some(effect) => effect(invocation),
            None => Ok(()),
        }
    }
}
