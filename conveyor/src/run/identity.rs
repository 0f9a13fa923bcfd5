//! Requester identity passed through to stage jobs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity on whose behalf a run's stage jobs execute.
///
/// The orchestrator never interprets this; it is carried in the run context
/// so stage runners can authenticate against the execution runtime and the
/// artifact store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequesterIdentity {
    /// The requesting user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// The session the request arrived in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,

    /// An authentication token usable by stage runners.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl RequesterIdentity {
    /// Creates an empty requester identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user ID.
    #[must_use]
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the session ID.
    #[must_use]
    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sets the authentication token.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}
