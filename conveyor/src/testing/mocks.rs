//! Mock stage runners and sub-job groups for testing.

use crate::destinations::Destination;
use crate::errors::LaunchError;
use crate::run::{RunContext, SubJobGroup};
use crate::stages::StageRunner;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// One recorded launch.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    /// The run the launch belonged to.
    pub run_id: Uuid,
    /// The per-stage destination handed to the runner.
    pub destination: Destination,
    /// The run context snapshot at launch time.
    pub context: RunContext,
}

/// A stage runner that records every launch and submits nothing.
///
/// Completion notifications are driven by the test itself.
#[derive(Debug, Default)]
pub struct RecordingStageRunner {
    launches: Mutex<Vec<LaunchRecord>>,
}

impl RecordingStageRunner {
    /// Creates a new recording runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times the runner was launched.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.launches.lock().len()
    }

    /// Returns all recorded launches.
    #[must_use]
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().clone()
    }

    /// Clears recorded launches.
    pub fn reset(&self) {
        self.launches.lock().clear();
    }
}

#[async_trait]
impl StageRunner for RecordingStageRunner {
    async fn launch(
        &self,
        ctx: &RunContext,
        destination: &Destination,
    ) -> Result<(), LaunchError> {
        self.launches.lock().push(LaunchRecord {
            run_id: ctx.run_id(),
            destination: destination.clone(),
            context: ctx.clone(),
        });
        Ok(())
    }
}

/// A stage runner whose submission always fails.
#[derive(Debug)]
pub struct FailingStageRunner {
    reason: String,
}

impl FailingStageRunner {
    /// Creates a runner that fails with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for FailingStageRunner {
    fn default() -> Self {
        Self::new("submission refused")
    }
}

#[async_trait]
impl StageRunner for FailingStageRunner {
    async fn launch(
        &self,
        _ctx: &RunContext,
        _destination: &Destination,
    ) -> Result<(), LaunchError> {
        Err(LaunchError::new(self.reason.clone()))
    }
}

/// A sub-job group whose readiness and success are set by the test.
#[derive(Debug)]
pub struct StaticSubJobGroup {
    count: usize,
    ready: AtomicBool,
    successful: AtomicBool,
}

impl StaticSubJobGroup {
    /// Creates a group of `count` sub-jobs, neither ready nor successful.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ready: AtomicBool::new(false),
            successful: AtomicBool::new(false),
        }
    }

    /// Sets whether the group reports ready.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Sets whether the group reports success.
    pub fn set_successful(&self, successful: bool) {
        self.successful.store(successful, Ordering::SeqCst);
    }
}

impl SubJobGroup for StaticSubJobGroup {
    fn job_count(&self) -> usize {
        self.count
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn successful(&self) -> bool {
        self.successful.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::WorkingSet;
    use crate::run::{RequesterIdentity, RunOptions};
    use crate::utils::generate_uuid;
    use std::collections::HashMap;

    fn test_context() -> RunContext {
        RunContext::new(
            generate_uuid(),
            RequesterIdentity::new(),
            WorkingSet::new("X"),
            HashMap::new(),
            HashMap::new(),
            Destination::new("output"),
            RunOptions::new(),
        )
    }

    #[tokio::test]
    async fn test_recording_runner() {
        let runner = RecordingStageRunner::new();
        let ctx = test_context();
        let destination = Destination::new("stage");

        runner.launch(&ctx, &destination).await.unwrap();
        runner.launch(&ctx, &destination).await.unwrap();

        assert_eq!(runner.launch_count(), 2);
        assert_eq!(runner.launches()[0].run_id, ctx.run_id());

        runner.reset();
        assert_eq!(runner.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_runner() {
        let runner = FailingStageRunner::new("no docker image");
        let ctx = test_context();
        let destination = Destination::new("stage");

        let err = runner.launch(&ctx, &destination).await.unwrap_err();
        assert!(err.to_string().contains("no docker image"));
    }

    #[test]
    fn test_static_group_flags() {
        let group = StaticSubJobGroup::new(4);
        assert_eq!(group.job_count(), 4);
        assert!(!group.ready());

        group.set_ready(true);
        group.set_successful(true);
        assert!(group.ready());
        assert!(group.successful());
    }
}
