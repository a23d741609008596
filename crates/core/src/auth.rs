use serde::{Deserialize, Serialize};

const SYSTEM_ACTOR_ID: &str = "system";
const SYSTEM_ACTOR_NAME: &str = "bootstrap";

/// Authenticated principal performing an operation.
///
/// Produced by the request authentication layer; the core only consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: String,
    display_name: String,
}

impl Actor {
    /// Creates an actor from an authenticated user id and display name.
    #[must_use]
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Returns the actor used for startup reconciliation writes.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR_ID, SYSTEM_ACTOR_NAME)
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the display name recorded in audit history.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns whether this is the built-in system actor.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.user_id == SYSTEM_ACTOR_ID
    }
}
