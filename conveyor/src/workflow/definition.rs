//! Stage and workflow definitions.

use crate::errors::WorkflowValidationError;
use crate::stages::StageRunner;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Definition of a single stage in a workflow.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    /// The unique name of the stage.
    pub name: String,
    /// Names of stages this stage depends on.
    pub dependencies: HashSet<String>,
    /// The launch behavior for the stage.
    pub runner: Arc<dyn StageRunner>,
}

impl StageDefinition {
    /// Creates a new stage definition with no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, runner: Arc<dyn StageRunner>) -> Self {
        Self {
            name: name.into(),
            dependencies: HashSet::new(),
            runner,
        }
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the stage definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the stage depends on itself.
    pub fn validate(&self) -> Result<(), WorkflowValidationError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowValidationError::new(
                "Stage name cannot be empty or whitespace-only",
            ));
        }
        if self.dependencies.contains(&self.name) {
            return Err(WorkflowValidationError::new(format!(
                "Stage '{}' cannot depend on itself",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        Ok(())
    }
}

/// An immutable workflow: a set of stage definitions in insertion order.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    stages: HashMap<String, StageDefinition>,
    order: Vec<String>,
}

impl Workflow {
    pub(super) fn new(name: String, stages: HashMap<String, StageDefinition>, order: Vec<String>) -> Self {
        Self { name, stages, order }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the workflow has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns true if a stage of this name is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Returns a stage definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.get(name)
    }

    /// Returns stage names in insertion order.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.order
    }

    /// Iterates stage definitions in insertion order.
    pub fn stages(&self) -> impl Iterator<Item = &StageDefinition> {
        self.order.iter().filter_map(|name| self.stages.get(name))
    }

    /// Returns the dependency names of a stage.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<&HashSet<String>> {
        self.stages.get(name).map(|def| &def.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::NoOpStageRunner;

    fn noop() -> Arc<dyn StageRunner> {
        Arc::new(NoOpStageRunner::new())
    }

    #[test]
    fn test_stage_definition_builders() {
        let def = StageDefinition::new("ortho", noop())
            .with_dependencies(["pansharpen", "dsm"]);

        assert_eq!(def.name, "ortho");
        assert_eq!(def.dependencies.len(), 2);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_self_dependency_rejected() {
        let def = StageDefinition::new("a", noop()).with_dependency("a");
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let def = StageDefinition::new("   ", noop());
        assert!(def.validate().is_err());
    }
}
