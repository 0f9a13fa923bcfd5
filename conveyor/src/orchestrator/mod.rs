//! The run orchestrator.
//!
//! One long-lived orchestrator serves every active run. A run starts with
//! `start_run`, after which the caller drives it by calling `advance`: once
//! right away, and once after every completion or failure notification.
//! `advance` computes which stages have all dependencies completed, marks
//! them running, and launches them through their stage runners; the launched
//! jobs report back asynchronously and out of order through the notification
//! handlers. The run is finalized when nothing is running and either every
//! stage completed or a failure occurred.
//!
//! All run state lives behind one coarse mutex. Collaborator calls (lineage
//! store, destination provider, stage runners) are never awaited while the
//! lock is held; a ready stage is marked running atomically before its
//! launch becomes visible.


use crate::destinations::{Destination, DestinationProvider};
use crate::errors::{ConveyorError, InvalidStateError};
use crate::events::{EventSink, NoOpEventSink};
use crate::lineage::{ArtifactRef, LineageStore, WorkingSet};
use crate::run::{
    CompositeStepTracker, RequesterIdentity, RunContext, RunOptions, RunState, StageState,
    SubJobGroup,
};
use crate::stages::StageRunner;
use crate::utils::generate_uuid;
use crate::workflow::Workflow;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// The result of one `advance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The run was finalized: nothing was running and either every stage
    /// had completed or a failure had occurred.
    Finalized,
    /// The named stages were launched. Empty when stages are still in
    /// flight and nothing new was ready.
    Launched(Vec<String>),
    /// Incomplete stages remain but none are running or ready (a dependency
    /// cycle or an unsatisfiable dependency). The run stays open for
    /// external inspection; a late notification may still resolve it.
    Stuck(Vec<String>),
}

/// Orchestrates workflow runs.
///
/// Owned by the hosting process and shared by reference with whatever
/// surfaces receive completion notifications (REST handlers, job event
/// listeners). The workflow definition is configured once; runs are
/// unbounded and independent.
pub struct RunOrchestrator {
    workflow: RwLock<Option<Arc<Workflow>>>,
    runs: Mutex<HashMap<Uuid, RunState>>,
    lineage: Arc<dyn LineageStore>,
    destinations: Arc<dyn DestinationProvider>,
    events: Arc<dyn EventSink>,
}

impl RunOrchestrator {
    /// Creates a new orchestrator with no workflow configured.
    #[must_use]
    pub fn new(lineage: Arc<dyn LineageStore>, destinations: Arc<dyn DestinationProvider>) -> Self {
        Self {
            workflow: RwLock::new(None),
            runs: Mutex::new(HashMap::new()),
            lineage,
            destinations,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the workflow definition.
    #[must_use]
    pub fn with_workflow(self, workflow: Workflow) -> Self {
        self.set_workflow(workflow);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Configures the workflow definition. Replaces any previous one; runs
    /// already started keep advancing against the definition they resolve
    /// at each `advance` call.
    pub fn set_workflow(&self, workflow: Workflow) {
        *self.workflow.write() = Some(Arc::new(workflow));
    }

    /// Returns the configured workflow, if any.
    #[must_use]
    pub fn workflow(&self) -> Option<Arc<Workflow>> {
        self.workflow.read().clone()
    }

    fn current_workflow(&self) -> Result<Arc<Workflow>, ConveyorError> {
        self.workflow
            .read()
            .clone()
            .ok_or(ConveyorError::WorkflowNotConfigured)
    }

    /// Returns true if the run is still in the store.
    #[must_use]
    pub fn is_active(&self, run_id: Uuid) -> bool {
        self.runs.lock().contains_key(&run_id)
    }

    /// Returns the number of active runs.
    #[must_use]
    pub fn active_runs(&self) -> usize {
        self.runs.lock().len()
    }

    /// Starts a new run of the workflow over `input`.
    ///
    /// Working sets already persisted as children of `input` are adopted:
    /// their stages are pre-marked completed and will not be re-launched.
    /// The caller must follow up with `advance` to launch the first stages.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotConfigured` if no workflow is set, or a lineage
    /// error if the store cannot be queried.
    pub async fn start_run(
        &self,
        input: WorkingSet,
        destination: Destination,
        options: RunOptions,
        requester: RequesterIdentity,
    ) -> Result<Uuid, ConveyorError> {
        let workflow = self.current_workflow()?;

        // Queried before the run id exists; nothing can race the adoption.
        let prior = self.lineage.children_of(input.id).await?;

        let run_id = generate_uuid();
        let mut run = RunState::new(
            run_id,
            workflow.stage_names().iter().map(String::as_str),
            input,
            destination,
            options,
            requester,
        );

        for ws in prior {
            match ws.stage_name.clone() {
                Some(stage) if workflow.contains(&stage) => {
                    tracing::info!(
                        run_id = %run_id,
                        stage = %stage,
                        working_set = %ws.id,
                        "adopting persisted working set; stage will not be re-run"
                    );
                    self.events.try_emit(
                        "stage.adopted",
                        Some(serde_json::json!({
                            "run_id": run_id.to_string(),
                            "stage": stage,
                            "working_set": ws.id.to_string(),
                        })),
                    );
                    run.adopt_completed(&stage, ws);
                }
                _ => {
                    tracing::warn!(
                        run_id = %run_id,
                        working_set = %ws.id,
                        name = %ws.name,
                        "working set does not name a workflow stage; ignoring"
                    );
                }
            }
        }

        tracing::info!(run_id = %run_id, input = %run.input_set().id, "run started");
        self.events.try_emit(
            "run.started",
            Some(serde_json::json!({ "run_id": run_id.to_string() })),
        );

        self.runs.lock().insert(run_id, run);
        Ok(run_id)
    }

    /// Discards a run's record. Idempotent; a no-op on an unknown id.
    pub fn finalize_run(&self, run_id: Uuid) {
        let mut runs = self.runs.lock();
        Self::remove_run(&mut runs, &self.events, run_id);
    }

    fn remove_run(
        runs: &mut HashMap<Uuid, RunState>,
        events: &Arc<dyn EventSink>,
        run_id: Uuid,
    ) {
        if runs.remove(&run_id).is_some() {
            tracing::info!(run_id = %run_id, "run finalized");
            events.try_emit(
                "run.finalized",
                Some(serde_json::json!({ "run_id": run_id.to_string() })),
            );
        }
    }

    /// Advances a run: finalizes it if it is done, reports it stuck if no
    /// progress is possible, and otherwise launches every stage whose
    /// dependencies are all completed.
    ///
    /// Safe to call redundantly; a second call with no intervening
    /// notification launches nothing. Launch order among simultaneously
    /// ready stages is unspecified.
    ///
    /// A stage whose destination cannot be created or whose runner fails to
    /// submit is recorded as failed, while its siblings proceed.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotConfigured` or `UnknownRun`.
    pub async fn advance(&self, run_id: Uuid) -> Result<AdvanceOutcome, ConveyorError> {
        let workflow = self.current_workflow()?;

        let launches: Vec<(String, Arc<dyn StageRunner>, RunContext)> = {
            let mut runs = self.runs.lock();
            let run = runs
                .get_mut(&run_id)
                .ok_or(ConveyorError::UnknownRun(run_id))?;

            let incomplete: Vec<String> = workflow
                .stage_names()
                .iter()
                .filter(|name| {
                    !matches!(
                        run.stage_state(name),
                        Some(StageState::Completed | StageState::Failed)
                    )
                })
                .cloned()
                .collect();
            let running = run.running_stages();

            tracing::debug!(
                run_id = %run_id,
                incomplete = ?incomplete,
                running = ?running,
                "advancing run"
            );

            // Done when nothing is in flight and either every stage
            // completed or a failure occurred. Stages independent of a
            // failed stage are not opportunistically completed.
            if running.is_empty() && (incomplete.is_empty() || run.has_failure()) {
                Self::remove_run(&mut runs, &self.events, run_id);
                return Ok(AdvanceOutcome::Finalized);
            }

            let ready: Vec<_> = workflow
                .stages()
                .filter(|def| {
                    run.stage_state(&def.name) == Some(StageState::Pending)
                        && def.dependencies.iter().all(|dep| run.is_completed(dep))
                })
                .collect();

            if running.is_empty() && ready.is_empty() {
                tracing::error!(
                    run_id = %run_id,
                    stuck = ?incomplete,
                    "no stage is running or ready; run is stuck"
                );
                self.events.try_emit(
                    "run.stuck",
                    Some(serde_json::json!({
                        "run_id": run_id.to_string(),
                        "stages": incomplete,
                    })),
                );
                return Ok(AdvanceOutcome::Stuck(incomplete));
            }

            let mut launches = Vec::with_capacity(ready.len());
            for def in ready {
                run.mark_running(&def.name)?;
                launches.push((def.name.clone(), def.runner.clone(), run.context()));
            }
            launches
        };

        if launches.is_empty() {
            return Ok(AdvanceOutcome::Launched(Vec::new()));
        }

        let results = join_all(launches.into_iter().map(|(stage, runner, ctx)| async move {
            let result = match self
                .destinations
                .ensure_child(ctx.destination(), &stage)
                .await
            {
                Ok(dest) => runner.launch(&ctx, &dest).await.map_err(|err| err.to_string()),
                Err(err) => Err(err.to_string()),
            };
            (stage, result)
        }))
        .await;

        let mut launched = Vec::new();
        for (stage, result) in results {
            match result {
                Ok(()) => {
                    tracing::info!(run_id = %run_id, stage = %stage, "stage launched");
                    self.events.try_emit(
                        "stage.launched",
                        Some(serde_json::json!({
                            "run_id": run_id.to_string(),
                            "stage": stage,
                        })),
                    );
                    launched.push(stage);
                }
                Err(reason) => {
                    tracing::error!(
                        run_id = %run_id,
                        stage = %stage,
                        reason = %reason,
                        "stage launch failed"
                    );
                    if let Err(err) = self.step_failed(run_id, &stage) {
                        tracing::error!(
                            run_id = %run_id,
                            stage = %stage,
                            error = %err,
                            "could not record launch failure"
                        );
                    }
                }
            }
        }

        Ok(AdvanceOutcome::Launched(launched))
    }

    /// Records an artifact produced by an in-flight stage. Multiple calls
    /// accumulate in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`.
    pub fn record_artifact(
        &self,
        run_id: Uuid,
        stage: &str,
        artifact: ArtifactRef,
    ) -> Result<(), ConveyorError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(&run_id)
            .ok_or(ConveyorError::UnknownRun(run_id))?;

        tracing::info!(
            run_id = %run_id,
            stage = %stage,
            artifact = %artifact.id,
            "recording artifact"
        );
        run.record_artifact(stage, artifact);
        Ok(())
    }

    /// Records a stage's captured output, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`.
    pub fn record_output(
        &self,
        run_id: Uuid,
        stage: &str,
        output: impl Into<String>,
    ) -> Result<(), ConveyorError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(&run_id)
            .ok_or(ConveyorError::UnknownRun(run_id))?;

        tracing::debug!(run_id = %run_id, stage = %stage, "recording captured output");
        run.record_output(stage, output);
        Ok(())
    }

    /// Attaches a composite step tracker for a stage that fanned out into
    /// parallel sub-jobs. The countdown starts at the group's job count.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`.
    pub fn register_composite_step(
        &self,
        run_id: Uuid,
        stage: &str,
        group: Arc<dyn SubJobGroup>,
    ) -> Result<(), ConveyorError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(&run_id)
            .ok_or(ConveyorError::UnknownRun(run_id))?;

        tracing::info!(
            run_id = %run_id,
            stage = %stage,
            sub_jobs = group.job_count(),
            "registering composite step"
        );
        run.register_tracker(stage, CompositeStepTracker::new(group));
        Ok(())
    }

    /// Acknowledges the completion of one sub-job of a composite stage.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`, or `InvalidState` if the stage has no tracker.
    pub fn acknowledge_sub_job(&self, run_id: Uuid, stage: &str) -> Result<(), ConveyorError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(&run_id)
            .ok_or(ConveyorError::UnknownRun(run_id))?;

        let tracker = run.tracker_mut(stage).ok_or_else(|| {
            InvalidStateError::new(run_id, stage, "stage has no composite tracker")
        })?;
        tracker.acknowledge();
        tracing::debug!(
            run_id = %run_id,
            stage = %stage,
            remaining = tracker.remaining(),
            "sub-job acknowledged"
        );
        Ok(())
    }

    /// Returns true if the stage has a composite tracker.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`.
    pub fn is_composite_step(&self, run_id: Uuid, stage: &str) -> Result<bool, ConveyorError> {
        let runs = self.runs.lock();
        let run = runs.get(&run_id).ok_or(ConveyorError::UnknownRun(run_id))?;
        Ok(run.tracker(stage).is_some())
    }

    /// Returns true once the stage's sub-job group reports ready and every
    /// sub-job has been acknowledged.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`, or `InvalidState` if the stage has no tracker.
    pub fn is_composite_step_complete(
        &self,
        run_id: Uuid,
        stage: &str,
    ) -> Result<bool, ConveyorError> {
        let runs = self.runs.lock();
        let run = runs.get(&run_id).ok_or(ConveyorError::UnknownRun(run_id))?;
        let tracker = run.tracker(stage).ok_or_else(|| {
            InvalidStateError::new(run_id, stage, "stage has no composite tracker")
        })?;
        Ok(tracker.is_complete())
    }

    /// Returns true if every sub-job of the stage's group succeeded.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`, or `InvalidState` if the stage has no tracker.
    pub fn is_composite_step_successful(
        &self,
        run_id: Uuid,
        stage: &str,
    ) -> Result<bool, ConveyorError> {
        let runs = self.runs.lock();
        let run = runs.get(&run_id).ok_or(ConveyorError::UnknownRun(run_id))?;
        let tracker = run.tracker(stage).ok_or_else(|| {
            InvalidStateError::new(run_id, stage, "stage has no composite tracker")
        })?;
        Ok(tracker.is_successful())
    }

    /// Records the successful completion of a stage. Must be called exactly
    /// once per stage per run, after the stage's entire body of work -
    /// including all sub-jobs for composite stages - has concluded.
    ///
    /// If the stage recorded artifacts, one working set is created for them,
    /// parented on the run's input set and named
    /// `"<input-name>: <stage-name>"`. In-flight artifacts and any composite
    /// tracker are cleared.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`, `InvalidState` if the stage is not running, or
    /// a lineage error if the working set cannot be persisted.
    pub async fn step_succeeded(&self, run_id: Uuid, stage: &str) -> Result<(), ConveyorError> {
        let pending = {
            let mut runs = self.runs.lock();
            let run = runs
                .get_mut(&run_id)
                .ok_or(ConveyorError::UnknownRun(run_id))?;

            run.mark_completed(stage)?;
            run.clear_tracker(stage);
            let artifacts = run.take_artifacts(stage);

            tracing::info!(
                run_id = %run_id,
                stage = %stage,
                artifacts = artifacts.len(),
                "stage succeeded"
            );
            self.events.try_emit(
                "stage.completed",
                Some(serde_json::json!({
                    "run_id": run_id.to_string(),
                    "stage": stage,
                })),
            );

            if artifacts.is_empty() {
                None
            } else {
                Some((run.input_set().clone(), artifacts))
            }
        };

        if let Some((input, artifacts)) = pending {
            let working_set = WorkingSet::derived(&input, stage, artifacts);
            let created = self.lineage.create(working_set).await?;
            tracing::info!(
                run_id = %run_id,
                stage = %stage,
                working_set = %created.id,
                "created working set"
            );

            let mut runs = self.runs.lock();
            if let Some(run) = runs.get_mut(&run_id) {
                run.attach_working_set(stage, created);
            } else {
                // The run was torn down while the store call was in flight.
                // The set persists and is re-adopted by the next run over
                // this input.
                tracing::warn!(
                    run_id = %run_id,
                    stage = %stage,
                    "run finalized before working set could be attached"
                );
            }
        }

        Ok(())
    }

    /// Records the failure of a stage. If nothing else is running the run is
    /// finalized immediately; stages that have not launched yet never will
    /// be.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun`, or `InvalidState` if the stage is not running.
    pub fn step_failed(&self, run_id: Uuid, stage: &str) -> Result<(), ConveyorError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(&run_id)
            .ok_or(ConveyorError::UnknownRun(run_id))?;

        run.mark_failed(stage)?;
        tracing::info!(run_id = %run_id, stage = %stage, "stage failed");
        self.events.try_emit(
            "stage.failed",
            Some(serde_json::json!({
                "run_id": run_id.to_string(),
                "stage": stage,
            })),
        );

        if !run.has_running() {
            Self::remove_run(&mut runs, &self.events, run_id);
        }
        Ok(())
    }
}
