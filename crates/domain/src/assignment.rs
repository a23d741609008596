use chrono::{DateTime, Utc};
use rolegate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::lifecycle::advance;
use crate::{AssignmentId, History, HistoryEntry, RoleId, dedup_ids};

/// Binds one user identity to a set of role ids.
///
/// There is at most one assignment per user; its absence means the user holds
/// no roles. Assignments are never deleted, revoking everything leaves an
/// empty role list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleAssignment {
    id: AssignmentId,
    user_id: String,
    #[serde(default)]
    role_ids: Vec<RoleId>,
    #[serde(default)]
    history: History,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u64,
}

impl UserRoleAssignment {
    /// Creates an empty assignment for a user.
    pub fn new(id: AssignmentId, user_id: &str, created_at: DateTime<Utc>) -> AppResult<Self> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::Validation("user id is required".to_owned()));
        }

        Ok(Self {
            id,
            user_id: user_id.to_owned(),
            role_ids: Vec::new(),
            history: History::default(),
            created_at,
            updated_at: created_at,
            revision: 0,
        })
    }

    /// Returns the assignment id.
    #[must_use]
    pub fn id(&self) -> &AssignmentId {
        &self.id
    }

    /// Returns the assigned user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns assigned role ids.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        self.role_ids.as_slice()
    }

    /// Returns the audit history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last mutation time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the optimistic concurrency revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sets the revision; reserved for document stores.
    pub fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Replaces assigned role ids and records one history entry.
    pub fn replace_role_ids(&mut self, role_ids: Vec<RoleId>, entry: HistoryEntry) {
        self.role_ids = dedup_ids(&role_ids);
        self.updated_at = advance(self.created_at, self.updated_at, entry.recorded_at());
        self.history.append(entry);
    }
}
