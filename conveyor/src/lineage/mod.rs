//! Artifact lineage model.
//!
//! Every run starts from an input working set. When a stage that recorded
//! artifacts succeeds, a new working set is created holding those artifact
//! references, parented on the run's input set. The resulting chain records
//! the provenance of everything a pipeline produced, and lets a later run
//! over the same input skip stages whose working sets already exist.

use crate::errors::LineageError;
use crate::utils::{generate_uuid, iso_timestamp};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A reference to an artifact produced by a stage.
///
/// The orchestrator treats artifacts as opaque: an identifier plus a display
/// name. The optional source item ID points at the stored item the artifact
/// was uploaded into, for collaborators that group artifacts by item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// A unique identifier for the artifact.
    pub id: Uuid,

    /// The display name of the artifact (conventionally a file name).
    pub name: String,

    /// The stored item this artifact belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_item_id: Option<Uuid>,
}

impl ArtifactRef {
    /// Creates a new artifact reference.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source_item_id: None,
        }
    }

    /// Sets the source item ID.
    #[must_use]
    pub fn with_source_item(mut self, item_id: Uuid) -> Self {
        self.source_item_id = Some(item_id);
        self
    }
}

/// An immutable record of the artifacts produced by one stage of a run.
///
/// The display name follows the `"<input-name>: <stage-name>"` convention
/// for derived sets; the stage is additionally stored in the explicit
/// `stage_name` field, which is what adoption at run start matches on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingSet {
    /// Unique identifier.
    pub id: Uuid,

    /// Human-readable name.
    pub name: String,

    /// The stage that produced this set. `None` for initial input sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,

    /// The set this one's inputs were drawn from. `None` for initial sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,

    /// References to the artifacts in this set. Order is not significant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactRef>,

    /// When the set was created (RFC 3339).
    pub created_at: String,
}

impl WorkingSet {
    /// Creates a new initial (input) working set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_uuid(),
            name: name.into(),
            stage_name: None,
            parent_id: None,
            artifacts: Vec::new(),
            created_at: iso_timestamp(),
        }
    }

    /// Creates the working set derived from `input` by a succeeded stage.
    #[must_use]
    pub fn derived(input: &WorkingSet, stage_name: &str, artifacts: Vec<ArtifactRef>) -> Self {
        Self {
            id: generate_uuid(),
            name: format!("{}: {}", input.name, stage_name),
            stage_name: Some(stage_name.to_string()),
            parent_id: Some(input.id),
            artifacts,
            created_at: iso_timestamp(),
        }
    }

    /// Adds artifact references.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: impl IntoIterator<Item = ArtifactRef>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    /// Returns true if this is an initial input set rather than a stage product.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.stage_name.is_none()
    }
}

/// Protocol for the durable lineage store.
///
/// The orchestrator creates working sets when stages succeed and queries
/// children of a run's input set at run start; it does not cache anything
/// across process restarts beyond what it re-adopts then.
#[async_trait]
pub trait LineageStore: Send + Sync {
    /// Persists a working set and returns the stored record.
    async fn create(&self, working_set: WorkingSet) -> Result<WorkingSet, LineageError>;

    /// Returns all working sets whose parent is `parent_id`.
    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<WorkingSet>, LineageError>;
}

/// In-memory lineage store.
#[derive(Debug, Default)]
pub struct InMemoryLineageStore {
    sets: RwLock<HashMap<Uuid, WorkingSet>>,
}

impl InMemoryLineageStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a working set by ID.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<WorkingSet> {
        self.sets.read().get(&id).cloned()
    }

    /// Returns the number of stored working sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.read().is_empty()
    }
}

#[async_trait]
impl LineageStore for InMemoryLineageStore {
    async fn create(&self, working_set: WorkingSet) -> Result<WorkingSet, LineageError> {
        self.sets.write().insert(working_set.id, working_set.clone());
        Ok(working_set)
    }

    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<WorkingSet>, LineageError> {
        Ok(self
            .sets
            .read()
            .values()
            .filter(|ws| ws.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_working_set() {
        let ws = WorkingSet::new("Jacksonville");
        assert!(ws.is_initial());
        assert!(ws.parent_id.is_none());
        assert!(ws.artifacts.is_empty());
    }

    #[test]
    fn test_derived_working_set_name_convention() {
        let input = WorkingSet::new("Jacksonville");
        let artifact = ArtifactRef::new(generate_uuid(), "output_DSM.tif");
        let derived = WorkingSet::derived(&input, "generate-dsm", vec![artifact]);

        assert_eq!(derived.name, "Jacksonville: generate-dsm");
        assert_eq!(derived.stage_name.as_deref(), Some("generate-dsm"));
        assert_eq!(derived.parent_id, Some(input.id));
        assert!(!derived.is_initial());
    }

    #[test]
    fn test_artifact_ref_with_source_item() {
        let item_id = generate_uuid();
        let artifact = ArtifactRef::new(generate_uuid(), "tile.tif").with_source_item(item_id);
        assert_eq!(artifact.source_item_id, Some(item_id));
    }

    #[test]
    fn test_working_set_serialization() {
        let input = WorkingSet::new("X");
        let derived = WorkingSet::derived(&input, "S", Vec::new());

        let json = serde_json::to_string(&derived).unwrap();
        let deserialized: WorkingSet = serde_json::from_str(&json).unwrap();

        assert_eq!(derived.id, deserialized.id);
        assert_eq!(deserialized.stage_name.as_deref(), Some("S"));
    }

    #[tokio::test]
    async fn test_in_memory_store_children_of() {
        let store = InMemoryLineageStore::new();
        let input = store.create(WorkingSet::new("X")).await.unwrap();

        store
            .create(WorkingSet::derived(&input, "a", Vec::new()))
            .await
            .unwrap();
        store
            .create(WorkingSet::derived(&input, "b", Vec::new()))
            .await
            .unwrap();

        // Unrelated set with a different parent
        let other = store.create(WorkingSet::new("Y")).await.unwrap();
        store
            .create(WorkingSet::derived(&other, "a", Vec::new()))
            .await
            .unwrap();

        let children = store.children_of(input.id).await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|ws| ws.parent_id == Some(input.id)));
    }
}
