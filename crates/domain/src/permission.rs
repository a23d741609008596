use rolegate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{HistoryEntry, ItemId, Lifecycle, PermissionId, Provenance, dedup_ids};

/// Descriptive fields of a permission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionInput {
    /// Unique human key.
    pub name: String,
    /// Optional menu label.
    pub menu: Option<String>,
    /// Optional button label.
    pub button: Option<String>,
}

/// Named set of item ids.
///
/// Items are shared between permissions; only their ids are persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    id: PermissionId,
    name: String,
    #[serde(default)]
    item_ids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    menu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    button: Option<String>,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Permission {
    /// Creates a permission listing `item_ids` (duplicates are dropped).
    pub fn new(
        id: PermissionId,
        input: PermissionInput,
        item_ids: Vec<ItemId>,
        provenance: Provenance,
        created: HistoryEntry,
    ) -> AppResult<Self> {
        let name = validate_name(input.name)?;

        Ok(Self {
            id,
            name,
            item_ids: dedup_ids(&item_ids),
            menu: input.menu.filter(|value| !value.trim().is_empty()),
            button: input.button.filter(|value| !value.trim().is_empty()),
            lifecycle: Lifecycle::new(provenance, created),
        })
    }

    /// Returns the permission id.
    #[must_use]
    pub fn id(&self) -> &PermissionId {
        &self.id
    }

    /// Returns the unique permission name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns member item ids, including ids of deleted items.
    #[must_use]
    pub fn item_ids(&self) -> &[ItemId] {
        self.item_ids.as_slice()
    }

    /// Returns the menu label.
    #[must_use]
    pub fn menu(&self) -> Option<&str> {
        self.menu.as_deref()
    }

    /// Returns the button label.
    #[must_use]
    pub fn button(&self) -> Option<&str> {
        self.button.as_deref()
    }

    /// Returns lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Returns mutable lifecycle state.
    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    /// Replaces the descriptive fields and records one history entry.
    pub fn apply_update(&mut self, input: PermissionInput, entry: HistoryEntry) -> AppResult<()> {
        self.lifecycle.ensure_active("permission")?;
        self.name = validate_name(input.name)?;
        self.menu = input.menu.filter(|value| !value.trim().is_empty());
        self.button = input.button.filter(|value| !value.trim().is_empty());
        self.lifecycle.record(entry);
        Ok(())
    }

    /// Replaces member item ids and records one history entry.
    pub fn replace_item_ids(
        &mut self,
        item_ids: Vec<ItemId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        self.lifecycle.ensure_active("permission")?;
        self.item_ids = dedup_ids(&item_ids);
        self.lifecycle.record(entry);
        Ok(())
    }
}

fn validate_name(name: String) -> AppResult<String> {
    NonEmptyString::new(name)
        .map(String::from)
        .map_err(|_| AppError::Validation("permission name is required".to_owned()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rolegate_core::Actor;

    use super::{Permission, PermissionInput};
    use crate::{HistoryEntry, ItemId, PermissionId, Provenance};

    fn entry(action: &str) -> HistoryEntry {
        HistoryEntry::new(&Actor::new("u1", "alice"), action, Utc::now())
    }

    #[test]
    fn creation_drops_duplicate_item_ids() {
        let permission = Permission::new(
            PermissionId::generate(),
            PermissionInput {
                name: "reports".to_owned(),
                ..PermissionInput::default()
            },
            vec![ItemId::new("i1"), ItemId::new("i1"), ItemId::new("i2")],
            Provenance::User,
            entry("created"),
        )
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(permission.item_ids(), &[ItemId::new("i1"), ItemId::new("i2")]);
        assert_eq!(permission.lifecycle().history().len(), 1);
    }

    #[test]
    fn serialized_form_stores_item_ids_only() {
        let permission = Permission::new(
            PermissionId::new("p1"),
            PermissionInput {
                name: "reports".to_owned(),
                ..PermissionInput::default()
            },
            vec![ItemId::new("i1")],
            Provenance::System,
            entry("created"),
        )
        .unwrap_or_else(|_| unreachable!());

        let encoded = serde_json::to_value(&permission).unwrap_or_default();
        assert_eq!(encoded["itemIds"], serde_json::json!(["i1"]));
        assert_eq!(encoded["provenance"], serde_json::json!("SYSTEM"));
        assert!(encoded.get("items").is_none());
    }
}
