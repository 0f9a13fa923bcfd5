//! Stage runner trait.
//!
//! Stage runners are the seam between the orchestrator and the execution
//! runtime. A runner builds and submits the out-of-process job (or jobs)
//! for one stage; the work itself happens elsewhere.

use crate::destinations::Destination;
use crate::errors::LaunchError;
use crate::run::RunContext;
use async_trait::async_trait;
use std::fmt::Debug;

/// Launch behavior for one stage of the workflow.
///
/// `launch` must return promptly after submitting the stage's work; it must
/// not wait for that work to finish. The submitted job is responsible for
/// eventually driving exactly one of `step_succeeded` / `step_failed` on the
/// orchestrator for this (run, stage) pair - and, for fan-out stages, one
/// `register_composite_step` plus one `acknowledge_sub_job` per sub-job,
/// completing the stage only once the composite tracker reports complete.
#[async_trait]
pub trait StageRunner: Send + Sync + Debug {
    /// Submits the stage's work.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Snapshot of the run at launch time
    /// * `destination` - The per-stage output destination
    ///
    /// # Errors
    ///
    /// Returns an error only if submission itself fails; such a failure is
    /// recorded as the stage's failure by the orchestrator.
    async fn launch(&self, ctx: &RunContext, destination: &Destination)
        -> Result<(), LaunchError>;
}

/// A stage runner that submits nothing.
///
/// Useful for wiring tests; a workflow built from no-op runners never
/// advances past its first stages because no completion is ever reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStageRunner;

impl NoOpStageRunner {
    /// Creates a new no-op runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageRunner for NoOpStageRunner {
    async fn launch(
        &self,
        _ctx: &RunContext,
        _destination: &Destination,
    ) -> Result<(), LaunchError> {
        Ok(())
    }
}
