//! Immutable run context handed to stage runners.

use super::{RequesterIdentity, RunOptions};
use crate::destinations::Destination;
use crate::lineage::WorkingSet;
use std::collections::HashMap;
use uuid::Uuid;

/// A snapshot of a run's state at launch time.
///
/// Stage runners receive everything they need to build and submit their
/// job: the input working set, the working sets produced by completed
/// upstream stages, captured output, the run's output destination, the
/// option bag, and the requester identity. The snapshot does not observe
/// later mutations of the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    requester: RequesterIdentity,
    input_set: WorkingSet,
    working_sets: HashMap<String, WorkingSet>,
    captured_output: HashMap<String, String>,
    destination: Destination,
    options: RunOptions,
}

impl RunContext {
    /// Creates a new run context snapshot.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        requester: RequesterIdentity,
        input_set: WorkingSet,
        working_sets: HashMap<String, WorkingSet>,
        captured_output: HashMap<String, String>,
        destination: Destination,
        options: RunOptions,
    ) -> Self {
        Self {
            run_id,
            requester,
            input_set,
            working_sets,
            captured_output,
            destination,
            options,
        }
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the requester identity.
    #[must_use]
    pub fn requester(&self) -> &RequesterIdentity {
        &self.requester
    }

    /// Returns the run's input working set.
    #[must_use]
    pub fn input_set(&self) -> &WorkingSet {
        &self.input_set
    }

    /// Returns the working set produced by a completed stage, if any.
    #[must_use]
    pub fn working_set(&self, stage: &str) -> Option<&WorkingSet> {
        self.working_sets.get(stage)
    }

    /// Returns all per-stage working sets.
    #[must_use]
    pub fn working_sets(&self) -> &HashMap<String, WorkingSet> {
        &self.working_sets
    }

    /// Returns the captured output of a stage, if any was recorded.
    #[must_use]
    pub fn captured_output(&self, stage: &str) -> Option<&str> {
        self.captured_output.get(stage).map(String::as_str)
    }

    /// Returns the run's output destination.
    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Returns the run option bag.
    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Returns a single option value.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_uuid;

    #[test]
    fn test_context_accessors() {
        let input = WorkingSet::new("X");
        let mut working_sets = HashMap::new();
        working_sets.insert("s1".to_string(), WorkingSet::derived(&input, "s1", Vec::new()));

        let mut options = RunOptions::new();
        options.insert("resolution".to_string(), serde_json::json!(0.25));

        let run_id = generate_uuid();
        let ctx = RunContext::new(
            run_id,
            RequesterIdentity::new(),
            input.clone(),
            working_sets,
            HashMap::new(),
            Destination::new("output"),
            options,
        );

        assert_eq!(ctx.run_id(), run_id);
        assert_eq!(ctx.input_set().id, input.id);
        assert!(ctx.working_set("s1").is_some());
        assert!(ctx.working_set("s2").is_none());
        assert_eq!(ctx.option("resolution"), Some(&serde_json::json!(0.25)));
        assert!(ctx.captured_output("s1").is_none());
    }
}
