//! Destination handles and the destination provider contract.
//!
//! A destination is where a run, or one stage of a run, stores its output.
//! The orchestrator only ever asks the provider for a child of the run's
//! destination named after a stage; what a destination physically is (a
//! folder, a bucket prefix) belongs to the hosting process.

use crate::errors::DestinationError;
use crate::utils::generate_uuid;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A handle to an output destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Unique identifier.
    pub id: Uuid,

    /// The destination name.
    pub name: String,

    /// The parent destination, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

impl Destination {
    /// Creates a new root destination.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_uuid(),
            name: name.into(),
            parent_id: None,
        }
    }

    /// Creates a child of `parent`.
    #[must_use]
    pub fn child_of(parent: &Destination, name: impl Into<String>) -> Self {
        Self {
            id: generate_uuid(),
            name: name.into(),
            parent_id: Some(parent.id),
        }
    }
}

/// Protocol for the destination provider.
#[async_trait]
pub trait DestinationProvider: Send + Sync {
    /// Returns the child of `parent` with the given name, creating it if it
    /// does not exist. Must be idempotent: a pre-existing child of the same
    /// name is reused, not duplicated.
    async fn ensure_child(
        &self,
        parent: &Destination,
        name: &str,
    ) -> Result<Destination, DestinationError>;
}

/// In-memory destination provider.
#[derive(Debug, Default)]
pub struct InMemoryDestinationProvider {
    children: RwLock<HashMap<(Uuid, String), Destination>>,
}

impl InMemoryDestinationProvider {
    /// Creates a new empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of child destinations created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    /// Returns true if no child destinations have been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }
}

#[async_trait]
impl DestinationProvider for InMemoryDestinationProvider {
    async fn ensure_child(
        &self,
        parent: &Destination,
        name: &str,
    ) -> Result<Destination, DestinationError> {
        let key = (parent.id, name.to_string());
        let mut children = self.children.write();

        if let Some(existing) = children.get(&key) {
            return Ok(existing.clone());
        }

        let child = Destination::child_of(parent, name);
        children.insert(key, child.clone());
        Ok(child)
    }
}
