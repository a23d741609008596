use chrono::{DateTime, Utc};
use rolegate_core::Actor;
use serde::{Deserialize, Serialize};

/// Immutable record of one mutation: who did it, what it was, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    actor_id: String,
    actor_name: String,
    action: String,
    recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates a history entry for an actor action.
    #[must_use]
    pub fn new(actor: &Actor, action: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            actor_id: actor.user_id().to_owned(),
            actor_name: actor.display_name().to_owned(),
            action: action.into(),
            recorded_at,
        }
    }

    /// Returns the acting user id.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        self.actor_id.as_str()
    }

    /// Returns the acting user display name.
    #[must_use]
    pub fn actor_name(&self) -> &str {
        self.actor_name.as_str()
    }

    /// Returns the action description.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the time the action was recorded.
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Append-only list of history entries.
///
/// Entries can only be appended; there is no API to remove or reorder them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    /// Appends one entry at the end.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.0.push(entry);
    }

    /// Returns all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        self.0.as_slice()
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no entry was recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.last()
    }
}
