//! Testing utilities for conveyor workflows.
//!
//! This module provides:
//! - Mock stage runners that record launches or fail on submission
//! - A controllable sub-job group for composite step tests
//! - A harness wiring an orchestrator to in-memory collaborators

mod fixtures;
mod mocks;

pub use fixtures::TestHarness;
pub use mocks::{FailingStageRunner, LaunchRecord, RecordingStageRunner, StaticSubJobGroup};
