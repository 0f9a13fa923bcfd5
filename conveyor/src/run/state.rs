//! The per-run record and stage state machine.

use super::composite::CompositeStepTracker;
use super::context::RunContext;
use super::identity::RequesterIdentity;
use super::RunOptions;
use crate::destinations::Destination;
use crate::errors::InvalidStateError;
use crate::lineage::{ArtifactRef, WorkingSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// The state of one stage within one run.
///
/// Transitions are one-way: `Pending -> Running -> {Completed | Failed}`.
/// `Running` is the only non-terminal state after launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// The stage has not been launched.
    Pending,
    /// The stage's job is in flight.
    Running,
    /// The stage finished successfully.
    Completed,
    /// The stage reported failure.
    Failed,
}

impl Default for StageState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The record of one active run.
///
/// Created at run start, mutated only under the orchestrator's lock, and
/// discarded exactly once at finalization.
#[derive(Debug)]
pub struct RunState {
    run_id: Uuid,
    requester: RequesterIdentity,
    input_set: WorkingSet,
    stage_states: HashMap<String, StageState>,
    working_sets: HashMap<String, WorkingSet>,
    captured_output: HashMap<String, String>,
    pending_artifacts: HashMap<String, Vec<ArtifactRef>>,
    destination: Destination,
    options: RunOptions,
    trackers: HashMap<String, CompositeStepTracker>,
}

impl RunState {
    /// Creates a fresh run record with every stage pending.
    #[must_use]
    pub fn new<'a>(
        run_id: Uuid,
        stage_names: impl IntoIterator<Item = &'a str>,
        input_set: WorkingSet,
        destination: Destination,
        options: RunOptions,
        requester: RequesterIdentity,
    ) -> Self {
        let stage_states = stage_names
            .into_iter()
            .map(|name| (name.to_string(), StageState::Pending))
            .collect();

        Self {
            run_id,
            requester,
            input_set,
            stage_states,
            working_sets: HashMap::new(),
            captured_output: HashMap::new(),
            pending_artifacts: HashMap::new(),
            destination,
            options,
            trackers: HashMap::new(),
        }
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the run's input working set.
    #[must_use]
    pub fn input_set(&self) -> &WorkingSet {
        &self.input_set
    }

    /// Returns the state of a stage, or `None` for a name the workflow does
    /// not define.
    #[must_use]
    pub fn stage_state(&self, stage: &str) -> Option<StageState> {
        self.stage_states.get(stage).copied()
    }

    /// Returns true if the stage is completed.
    #[must_use]
    pub fn is_completed(&self, stage: &str) -> bool {
        self.stage_state(stage) == Some(StageState::Completed)
    }

    /// Returns the names of stages currently running.
    #[must_use]
    pub fn running_stages(&self) -> Vec<String> {
        self.stage_states
            .iter()
            .filter(|(_, state)| **state == StageState::Running)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns true if any stage is currently running.
    #[must_use]
    pub fn has_running(&self) -> bool {
        self.stage_states
            .values()
            .any(|state| *state == StageState::Running)
    }

    /// Returns true if any stage has failed.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.stage_states
            .values()
            .any(|state| *state == StageState::Failed)
    }

    fn transition(
        &mut self,
        stage: &str,
        from: StageState,
        to: StageState,
    ) -> Result<(), InvalidStateError> {
        match self.stage_states.get_mut(stage) {
            Some(state) if *state == from => {
                *state = to;
                Ok(())
            }
            Some(state) => Err(InvalidStateError::new(
                self.run_id,
                stage,
                format!("expected stage to be {from}, but it is {state}"),
            )),
            None => Err(InvalidStateError::new(
                self.run_id,
                stage,
                "stage is not part of the workflow",
            )),
        }
    }

    /// Marks a pending stage as running.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is not pending.
    pub fn mark_running(&mut self, stage: &str) -> Result<(), InvalidStateError> {
        self.transition(stage, StageState::Pending, StageState::Running)
    }

    /// Marks a running stage as completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is not running.
    pub fn mark_completed(&mut self, stage: &str) -> Result<(), InvalidStateError> {
        self.transition(stage, StageState::Running, StageState::Completed)
    }

    /// Marks a running stage as failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is not running.
    pub fn mark_failed(&mut self, stage: &str) -> Result<(), InvalidStateError> {
        self.transition(stage, StageState::Running, StageState::Failed)
    }

    /// Adopts a previously persisted working set: the stage is marked
    /// completed without ever launching.
    pub fn adopt_completed(&mut self, stage: &str, working_set: WorkingSet) {
        self.stage_states
            .insert(stage.to_string(), StageState::Completed);
        self.working_sets.insert(stage.to_string(), working_set);
    }

    /// Appends an artifact to a stage's in-flight list.
    pub fn record_artifact(&mut self, stage: &str, artifact: ArtifactRef) {
        self.pending_artifacts
            .entry(stage.to_string())
            .or_default()
            .push(artifact);
    }

    /// Replaces a stage's captured output (last write wins).
    pub fn record_output(&mut self, stage: &str, output: impl Into<String>) {
        self.captured_output.insert(stage.to_string(), output.into());
    }

    /// Removes and returns a stage's in-flight artifacts.
    #[must_use]
    pub fn take_artifacts(&mut self, stage: &str) -> Vec<ArtifactRef> {
        self.pending_artifacts.remove(stage).unwrap_or_default()
    }

    /// Attaches the working set produced by a completed stage.
    pub fn attach_working_set(&mut self, stage: &str, working_set: WorkingSet) {
        self.working_sets.insert(stage.to_string(), working_set);
    }

    /// Returns the working set produced by a stage, if any.
    #[must_use]
    pub fn working_set(&self, stage: &str) -> Option<&WorkingSet> {
        self.working_sets.get(stage)
    }

    /// Attaches a composite step tracker to a stage.
    pub fn register_tracker(&mut self, stage: &str, tracker: CompositeStepTracker) {
        self.trackers.insert(stage.to_string(), tracker);
    }

    /// Returns a stage's composite tracker, if one was registered.
    #[must_use]
    pub fn tracker(&self, stage: &str) -> Option<&CompositeStepTracker> {
        self.trackers.get(stage)
    }

    /// Returns a stage's composite tracker mutably, if one was registered.
    #[must_use]
    pub fn tracker_mut(&mut self, stage: &str) -> Option<&mut CompositeStepTracker> {
        self.trackers.get_mut(stage)
    }

    /// Removes a stage's composite tracker.
    pub fn clear_tracker(&mut self, stage: &str) {
        self.trackers.remove(stage);
    }

    /// Snapshots the run for a stage launch.
    #[must_use]
    pub fn context(&self) -> RunContext {
        RunContext::new(
            self.run_id,
            self.requester.clone(),
            self.input_set.clone(),
            self.working_sets.clone(),
            self.captured_output.clone(),
            self.destination.clone(),
            self.options.clone(),
        )
    }
}
