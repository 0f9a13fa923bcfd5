//! Error types for the conveyor orchestration engine.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for conveyor operations.
#[derive(Debug, Error)]
pub enum ConveyorError {
    /// No workflow definition has been configured on the orchestrator.
    #[error("Workflow not configured")]
    WorkflowNotConfigured,

    /// An operation referenced a run ID that is not in the store.
    #[error("Unknown run ID: '{0}'")]
    UnknownRun(Uuid),

    /// An operation was invalid for the current state of the run.
    #[error("{0}")]
    InvalidState(#[from] InvalidStateError),

    /// The lineage store reported a failure.
    #[error("{0}")]
    Lineage(#[from] LineageError),

    /// The destination provider reported a failure.
    #[error("{0}")]
    Destination(#[from] DestinationError),
}

/// Error raised when a workflow definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WorkflowValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl WorkflowValidationError {
    /// Creates a new workflow validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised when a notification or query does not match the run's state,
/// e.g. completing a stage that is not running, or acknowledging a sub-job
/// for a stage that has no composite tracker.
#[derive(Debug, Clone, Error)]
#[error("Invalid state for stage '{stage}' in run '{run_id}': {message}")]
pub struct InvalidStateError {
    /// The run the operation targeted.
    pub run_id: Uuid,
    /// The stage the operation targeted.
    pub stage: String,
    /// What was wrong.
    pub message: String,
}

impl InvalidStateError {
    /// Creates a new invalid state error.
    #[must_use]
    pub fn new(run_id: Uuid, stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            run_id,
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Error reported by a lineage store implementation.
#[derive(Debug, Clone, Error)]
#[error("Lineage store error: {message}")]
pub struct LineageError {
    /// The error message.
    pub message: String,
}

impl LineageError {
    /// Creates a new lineage error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error reported by a destination provider implementation.
#[derive(Debug, Clone, Error)]
#[error("Destination provider error: {message}")]
pub struct DestinationError {
    /// The error message.
    pub message: String,
}

impl DestinationError {
    /// Creates a new destination error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error reported by a stage runner when launching stage work fails
/// synchronously, before any completion notification could be issued.
#[derive(Debug, Clone, Error)]
#[error("Failed to launch stage work: {message}")]
pub struct LaunchError {
    /// The error message.
    pub message: String,
}

impl LaunchError {
    /// Creates a new launch error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
