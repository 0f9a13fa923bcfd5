//! # Conveyor
//!
//! A workflow orchestration engine for dependency-ordered, out-of-process
//! processing pipelines.
//!
//! A workflow is a directed acyclic graph of named stages. Each stage's work
//! runs out of process - a container job, a worker task - and may fan out
//! into many parallel sub-jobs. The orchestrator tracks per-run state,
//! decides which stages are eligible to start, launches them through their
//! stage runners, and advances the run as completion notifications arrive
//! asynchronously and out of order. Artifacts produced by succeeded stages
//! are recorded as working sets, forming a provenance chain from the run's
//! input that later runs can resume from.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conveyor::prelude::*;
//!
//! // Define a workflow
//! let workflow = WorkflowBuilder::new("imagery")
//!     .stage("pansharpen", pansharpen_runner, &[])?
//!     .stage("generate-dsm", dsm_runner, &["pansharpen"])?
//!     .stage("orthorectify", ortho_runner, &["pansharpen", "generate-dsm"])?
//!     .build()?;
//!
//! // Wire the orchestrator to the hosting process's collaborators
//! let orchestrator = RunOrchestrator::new(lineage_store, destination_provider)
//!     .with_workflow(workflow);
//!
//! // Start a run, then advance it after every completion notification
//! let run_id = orchestrator
//!     .start_run(input_set, output_destination, options, requester)
//!     .await?;
//! orchestrator.advance(run_id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod destinations;
pub mod errors;
pub mod events;
pub mod lineage;
pub mod observability;
pub mod orchestrator;
pub mod run;
pub mod stages;
pub mod testing;
pub mod utils;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::destinations::{Destination, DestinationProvider, InMemoryDestinationProvider};
    pub use crate::errors::{
        ConveyorError, DestinationError, InvalidStateError, LaunchError, LineageError,
        WorkflowValidationError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::lineage::{ArtifactRef, InMemoryLineageStore, LineageStore, WorkingSet};
    pub use crate::orchestrator::{AdvanceOutcome, RunOrchestrator};
    pub use crate::run::{
        CompositeStepTracker, RequesterIdentity, RunContext, RunOptions, StageState, SubJobGroup,
    };
    pub use crate::stages::{NoOpStageRunner, StageRunner};
    pub use crate::utils::{generate_uuid, iso_timestamp};
    pub use crate::workflow::{StageDefinition, Workflow, WorkflowBuilder};
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
