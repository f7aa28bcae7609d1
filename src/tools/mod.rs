//! External tool invocation.
//!
//! Every stage talks to ogr2ogr, osmium and the Gradle wrapper through the
//! [`ToolRunner`] trait so exit codes are checked in one place.

pub mod mock;
mod runner;

pub use mock::RecordingRunner;
pub use runner::{SystemToolRunner, ToolInvocation, ToolRunner};
