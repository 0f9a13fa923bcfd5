//! Event sink system for observability.
//!
//! The orchestrator emits an event for each run and stage transition
//! (`run.started`, `run.finalized`, `run.stuck`, `stage.launched`,
//! `stage.completed`, `stage.failed`, `stage.adopted`). Sinks are injected
//! explicitly; there is no global sink registry.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
