use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use rolegate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{History, HistoryEntry};

/// Origin of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Seeded by the bootstrap reconciler.
    System,
    /// Created through the administrative API.
    User,
}

impl Provenance {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::User => "USER",
        }
    }
}

impl FromStr for Provenance {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SYSTEM" => Ok(Self::System),
            "USER" => Ok(Self::User),
            _ => Err(AppError::Validation(format!(
                "unknown provenance value '{value}'"
            ))),
        }
    }
}

/// Shared soft-delete, provenance, audit and revision state of catalog entities.
///
/// `deleted` only ever moves from `false` to `true`, history is append-only and
/// `updated_at` never precedes `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    provenance: Option<Provenance>,
    #[serde(default)]
    history: History,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u64,
}

impl Lifecycle {
    /// Creates state for a new entity whose first history entry is `created`.
    #[must_use]
    pub fn new(provenance: Provenance, created: HistoryEntry) -> Self {
        let created_at = created.recorded_at();
        let mut history = History::default();
        history.append(created);

        Self {
            deleted: false,
            provenance: Some(provenance),
            history,
            created_at,
            updated_at: created_at,
            revision: 0,
        }
    }

    /// Returns whether the entity was soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the recorded provenance; `None` for documents predating provenance tracking.
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        self.provenance
    }

    /// Returns whether the entity was seeded by the system.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.provenance == Some(Provenance::System)
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

    /// Appends one history entry and advances `updated_at`.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.updated_at = advance(self.created_at, self.updated_at, entry.recorded_at());
        self.history.append(entry);
    }

    /// Flags the entity as deleted.
    pub fn mark_deleted(&mut self, entry: HistoryEntry) -> AppResult<()> {
        if self.deleted {
            return Err(AppError::Conflict("entity is already deleted".to_owned()));
        }

        self.deleted = true;
        self.record(entry);
        Ok(())
    }

    /// Sets system provenance when none was recorded; returns whether it changed.
    ///
    /// Records nothing; the caller appends one entry for the whole write.
    pub fn adopt_system_provenance(&mut self) -> bool {
        if self.provenance.is_some() {
            return false;
        }

        self.provenance = Some(Provenance::System);
        true
    }

    /// Fails when the entity is soft-deleted.
    pub fn ensure_active(&self, label: &str) -> AppResult<()> {
        if self.deleted {
            return Err(AppError::Conflict(format!("{label} is deleted")));
        }

        Ok(())
    }
}

/// Strictly advances a last-update time, never preceding creation.
pub(crate) fn advance(
    created_at: DateTime<Utc>,
    previous: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let candidate = now.max(created_at);
    if candidate > previous {
        candidate
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
