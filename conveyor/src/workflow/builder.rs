//! Workflow builder with validation.

use super::definition::{StageDefinition, Workflow};
use crate::errors::WorkflowValidationError;
use crate::stages::StageRunner;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for creating validated workflows.
///
/// Duplicate names, empty names, and self-dependencies are build errors.
/// Dependencies on names that never get defined, and dependency cycles, are
/// NOT build errors: the orchestrator surfaces them at runtime as a stuck
/// run, where external inspection can still see the state. The builder logs
/// a warning for unresolved names so misconfigurations are visible early.
#[derive(Debug, Clone, Default)]
pub struct WorkflowBuilder {
    name: String,
    stages: HashMap<String, StageDefinition>,
    order: Vec<String>,
}

impl WorkflowBuilder {
    /// Creates a new workflow builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Adds a stage to the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage fails validation or the name is taken.
    pub fn stage(
        mut self,
        name: impl Into<String>,
        runner: Arc<dyn StageRunner>,
        dependencies: &[&str],
    ) -> Result<Self, WorkflowValidationError> {
        let def = StageDefinition::new(name, runner)
            .with_dependencies(dependencies.iter().copied());
        self.add_stage(def)?;
        Ok(self)
    }

    /// Adds a stage definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage fails validation or the name is taken.
    pub fn add_stage(&mut self, def: StageDefinition) -> Result<(), WorkflowValidationError> {
        def.validate()?;

        if self.stages.contains_key(&def.name) {
            return Err(WorkflowValidationError::new(format!(
                "Duplicate stage name '{}'",
                def.name
            ))
            .with_stages(vec![def.name]));
        }

        self.order.push(def.name.clone());
        self.stages.insert(def.name.clone(), def);
        Ok(())
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if no stages were added.
    pub fn build(self) -> Result<Workflow, WorkflowValidationError> {
        if self.stages.is_empty() {
            return Err(WorkflowValidationError::new("Workflow has no stages"));
        }

        for def in self.stages.values() {
            for dep in &def.dependencies {
                if !self.stages.contains_key(dep) {
                    tracing::warn!(
                        workflow = %self.name,
                        stage = %def.name,
                        dependency = %dep,
                        "stage depends on a name that is not defined; it will never become ready"
                    );
                }
            }
        }

        Ok(Workflow::new(self.name, self.stages, self.order))
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
    fn test_builder_preserves_insertion_order() {
        let workflow = WorkflowBuilder::new("imagery")
            .stage("pansharpen", noop(), &[])
            .unwrap()
            .stage("dsm", noop(), &[])
            .unwrap()
            .stage("ortho", noop(), &["pansharpen", "dsm"])
            .unwrap()
            .build()
            .unwrap();

        let names: Vec<&str> = workflow.stage_names().iter().map(String::as_str).collect();
        assert_eq!(names, ["pansharpen", "dsm", "ortho"]);
        assert_eq!(workflow.len(), 3);
        assert_eq!(workflow.dependencies_of("ortho").unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let result = WorkflowBuilder::new("w")
            .stage("a", noop(), &[])
            .unwrap()
            .stage("a", noop(), &[]);

        assert!(result.is_err());
    }

    #[test]
    fn test_empty_workflow_rejected() {
        assert!(WorkflowBuilder::new("w").build().is_err());
    }

    #[test]
    fn test_unknown_dependency_is_not_a_build_error() {
        // Deliberate: unsatisfiable dependencies surface as a stuck run at
        // runtime, so building this workflow must succeed.
        let workflow = WorkflowBuilder::new("w")
            .stage("b", noop(), &["does-not-exist"])
            .unwrap()
            .build()
            .unwrap();

        assert!(workflow.contains("b"));
        assert!(!workflow.contains("does-not-exist"));
    }

    #[test]
    fn test_dependency_cycle_is_not_a_build_error() {
        // Cycles are likewise a runtime stuck condition.
        let mut builder = WorkflowBuilder::new("w");
        builder
            .add_stage(StageDefinition::new("a", noop()).with_dependency("b"))
            .unwrap();
        builder
            .add_stage(StageDefinition::new("b", noop()).with_dependency("a"))
            .unwrap();

        assert!(builder.build().is_ok());
    }
}
