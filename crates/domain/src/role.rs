use rolegate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{HistoryEntry, Lifecycle, PermissionId, Provenance, RoleId, dedup_ids};

/// Descriptive fields of a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleInput {
    /// Unique human key.
    pub name: String,
    /// Optional menu label.
    pub menu: Option<String>,
    /// Optional button label.
    pub button: Option<String>,
}

/// Named set of permission ids plus the role ids its holders may delegate.
///
/// Roles never inherit from each other. The delegation list only states which
/// roles a holder may hand out; it grants no permissions by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    id: RoleId,
    name: String,
    #[serde(default)]
    permission_ids: Vec<PermissionId>,
    #[serde(default)]
    delegated_role_ids: Vec<RoleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    menu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    button: Option<String>,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Role {
    /// Creates a role (duplicate ids are dropped).
    pub fn new(
        id: RoleId,
        input: RoleInput,
        permission_ids: Vec<PermissionId>,
        delegated_role_ids: Vec<RoleId>,
        provenance: Provenance,
        created: HistoryEntry,
    ) -> AppResult<Self> {
        let name = validate_name(input.name)?;
        ensure_not_self_delegated(&id, &delegated_role_ids)?;

        Ok(Self {
            id,
            name,
            permission_ids: dedup_ids(&permission_ids),
            delegated_role_ids: dedup_ids(&delegated_role_ids),
            menu: input.menu.filter(|value| !value.trim().is_empty()),
            button: input.button.filter(|value| !value.trim().is_empty()),
            lifecycle: Lifecycle::new(provenance, created),
        })
    }

    /// Returns the role id.
    #[must_use]
    pub fn id(&self) -> &RoleId {
        &self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns member permission ids.
    #[must_use]
    pub fn permission_ids(&self) -> &[PermissionId] {
        self.permission_ids.as_slice()
    }

    /// Returns ids of roles this role's holders may grant to others.
    #[must_use]
    pub fn delegated_role_ids(&self) -> &[RoleId] {
        self.delegated_role_ids.as_slice()
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
    pub fn apply_update(&mut self, input: RoleInput, entry: HistoryEntry) -> AppResult<()> {
        self.lifecycle.ensure_active("role")?;
        self.name = validate_name(input.name)?;
        self.menu = input.menu.filter(|value| !value.trim().is_empty());
        self.button = input.button.filter(|value| !value.trim().is_empty());
        self.lifecycle.record(entry);
        Ok(())
    }

    /// Replaces member permission ids and records one history entry.
    pub fn replace_permission_ids(
        &mut self,
        permission_ids: Vec<PermissionId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        self.lifecycle.ensure_active("role")?;
        self.permission_ids = dedup_ids(&permission_ids);
        self.lifecycle.record(entry);
        Ok(())
    }

    /// Replaces delegated role ids and records one history entry.
    pub fn replace_delegated_role_ids(
        &mut self,
        delegated_role_ids: Vec<RoleId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        self.lifecycle.ensure_active("role")?;
        ensure_not_self_delegated(&self.id, &delegated_role_ids)?;

        self.delegated_role_ids = dedup_ids(&delegated_role_ids);
        self.lifecycle.record(entry);
        Ok(())
    }

    /// Replaces both member lists under a single history entry.
    pub fn replace_members(
        &mut self,
        permission_ids: Vec<PermissionId>,
        delegated_role_ids: Vec<RoleId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        self.lifecycle.ensure_active("role")?;
        ensure_not_self_delegated(&self.id, &delegated_role_ids)?;

        self.permission_ids = dedup_ids(&permission_ids);
        self.delegated_role_ids = dedup_ids(&delegated_role_ids);
        self.lifecycle.record(entry);
        Ok(())
    }
}

fn validate_name(name: String) -> AppResult<String> {
    NonEmptyString::new(name)
        .map(String::from)
        .map_err(|_| AppError::Validation("role name is required".to_owned()))
}

fn ensure_not_self_delegated(id: &RoleId, delegated_role_ids: &[RoleId]) -> AppResult<()> {
    if delegated_role_ids.contains(id) {
        return Err(AppError::Validation(format!(
            "role '{id}' cannot delegate itself"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rolegate_core::{Actor, AppError};

    use super::{Role, RoleInput};
    use crate::{HistoryEntry, PermissionId, Provenance, RoleId};

    fn entry(action: &str) -> HistoryEntry {
        HistoryEntry::new(&Actor::new("u1", "alice"), action, Utc::now())
    }

    fn role(id: &str) -> Role {
        Role::new(
            RoleId::new(id),
            RoleInput {
                name: format!("role {id}"),
                ..RoleInput::default()
            },
            Vec::new(),
            Vec::new(),
            Provenance::User,
            entry("created"),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn role_cannot_delegate_itself() {
        let mut manager = role("manager");
        let result =
            manager.replace_delegated_role_ids(vec![RoleId::new("manager")], entry("delegate"));
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(manager.delegated_role_ids().is_empty());
        assert_eq!(manager.lifecycle().history().len(), 1);
    }

    #[test]
    fn delegation_list_is_deduplicated() {
        let mut manager = role("manager");
        let result = manager.replace_delegated_role_ids(
            vec![RoleId::new("clerk"), RoleId::new("clerk")],
            entry("delegate"),
        );
        assert!(result.is_ok());
        assert_eq!(manager.delegated_role_ids(), &[RoleId::new("clerk")]);
    }

    #[test]
    fn member_lists_change_under_one_entry() {
        let mut manager = role("manager");
        let result = manager.replace_members(
            vec![PermissionId::new("p1"), PermissionId::new("p1")],
            vec![RoleId::new("clerk")],
            entry("reconciled members"),
        );
        assert!(result.is_ok());
        assert_eq!(manager.permission_ids(), &[PermissionId::new("p1")]);
        assert_eq!(manager.delegated_role_ids(), &[RoleId::new("clerk")]);
        assert_eq!(manager.lifecycle().history().len(), 2);

        let rejected = manager.replace_members(
            Vec::new(),
            vec![RoleId::new("manager")],
            entry("reconciled members"),
        );
        assert!(matches!(rejected, Err(AppError::Validation(_))));
        assert_eq!(manager.permission_ids(), &[PermissionId::new("p1")]);
    }
}
