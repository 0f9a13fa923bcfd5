//! Test fixtures.

use crate::destinations::{Destination, InMemoryDestinationProvider};
use crate::errors::ConveyorError;
use crate::events::CollectingEventSink;
use crate::lineage::{InMemoryLineageStore, WorkingSet};
use crate::orchestrator::RunOrchestrator;
use crate::run::{RequesterIdentity, RunOptions};
use crate::workflow::Workflow;
use std::sync::Arc;
use uuid::Uuid;

/// An orchestrator wired to in-memory collaborators, with handles kept so
/// tests can seed the lineage store and inspect events and destinations.
pub struct TestHarness {
    /// The orchestrator under test.
    pub orchestrator: Arc<RunOrchestrator>,
    /// The in-memory lineage store.
    pub lineage: Arc<InMemoryLineageStore>,
    /// The in-memory destination provider.
    pub destinations: Arc<InMemoryDestinationProvider>,
    /// The collecting event sink.
    pub events: Arc<CollectingEventSink>,
}

impl TestHarness {
    /// Creates a harness with the given workflow configured.
    #[must_use]
    pub fn new(workflow: Workflow) -> Self {
        let harness = Self::without_workflow();
        harness.orchestrator.set_workflow(workflow);
        harness
    }

    /// Creates a harness with no workflow configured.
    #[must_use]
    pub fn without_workflow() -> Self {
        let lineage = Arc::new(InMemoryLineageStore::new());
        let destinations = Arc::new(InMemoryDestinationProvider::new());
        let events = Arc::new(CollectingEventSink::new());
        let orchestrator = Arc::new(
            RunOrchestrator::new(
                lineage.clone() as Arc<dyn crate::lineage::LineageStore>,
                destinations.clone() as Arc<dyn crate::destinations::DestinationProvider>,
            )
            .with_event_sink(events.clone() as Arc<dyn crate::events::EventSink>),
        );

        Self {
            orchestrator,
            lineage,
            destinations,
            events,
        }
    }

    /// Starts a run over `input` with a fresh output destination, empty
    /// options, and an anonymous requester.
    ///
    /// # Errors
    ///
    /// Propagates errors from `start_run`.
    pub async fn start(&self, input: WorkingSet) -> Result<Uuid, ConveyorError> {
        self.orchestrator
            .start_run(
                input,
                Destination::new("output"),
                RunOptions::new(),
                RequesterIdentity::new(),
            )
            .await
    }
}
