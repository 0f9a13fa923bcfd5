//! Per-run state management.
//!
//! This module provides:
//! - The run record and explicit per-stage state machine
//! - The immutable run context handed to stage runners
//! - Requester identity passed through to stage jobs
//! - Composite step tracking for stages that fan out into sub-jobs

mod composite;
mod context;
mod identity;
mod state;

pub use composite::{CompositeStepTracker, SubJobGroup};
pub use context::RunContext;
pub use identity::RequesterIdentity;
pub use state::{RunState, StageState};

/// Opaque run-scoped configuration, passed through to stage runners
/// untouched by the orchestrator.
pub type RunOptions = std::collections::HashMap<String, serde_json::Value>;
