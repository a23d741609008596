use std::collections::HashSet;
use std::hash::Hash;

use rolegate_core::{AppError, AppResult};
use rolegate_domain::{HTTP_METHODS, Item, ItemId, PermissionId, Role, RoleId};

use crate::CallerAuthority;

/// Ids a caller is allowed to grant or revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantableSet {
    unrestricted: bool,
    item_ids: HashSet<ItemId>,
    permission_ids: HashSet<PermissionId>,
    role_ids: HashSet<RoleId>,
}

impl GrantableSet {
    /// Returns whether the caller holds a wildcard item for every HTTP method.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    /// Returns grantable item ids.
    #[must_use]
    pub fn item_ids(&self) -> &HashSet<ItemId> {
        &self.item_ids
    }

    /// Returns grantable permission ids.
    #[must_use]
    pub fn permission_ids(&self) -> &HashSet<PermissionId> {
        &self.permission_ids
    }

    /// Returns grantable role ids.
    #[must_use]
    pub fn role_ids(&self) -> &HashSet<RoleId> {
        &self.role_ids
    }

    /// Returns whether every requested item id is grantable.
    #[must_use]
    pub fn permits_items(&self, requested: &[ItemId]) -> bool {
        self.unrestricted || contains_all(&self.item_ids, requested)
    }

    /// Returns whether every requested permission id is grantable.
    #[must_use]
    pub fn permits_permissions(&self, requested: &[PermissionId]) -> bool {
        self.unrestricted || contains_all(&self.permission_ids, requested)
    }

    /// Returns whether every requested role id is grantable.
    #[must_use]
    pub fn permits_roles(&self, requested: &[RoleId]) -> bool {
        self.unrestricted || contains_all(&self.role_ids, requested)
    }

    fn denied<'a, T>(&self, held: &HashSet<T>, requested: &'a [T]) -> Vec<&'a T>
    where
        T: Eq + Hash,
    {
        if self.unrestricted {
            return Vec::new();
        }

        requested.iter().filter(|id| !held.contains(*id)).collect()
    }
}

fn contains_all<T: Eq + Hash>(held: &HashSet<T>, requested: &[T]) -> bool {
    requested.iter().all(|id| held.contains(id))
}

/// Computes what a caller holding `caller_roles` and `caller_items` may grant.
///
/// The result is the union of the caller's reachable items, the permission
/// ids of the caller's non-deleted roles and the role ids on those roles'
/// delegation lists, plus the default role when one is configured. Holding a
/// role does not make that role itself grantable.
///
/// A caller whose items include an active `admin:<METHOD>` wildcard for every
/// HTTP method is unrestricted and may grant any id.
#[must_use]
pub fn grantable_set(
    caller_roles: &[Role],
    caller_items: &[Item],
    default_role_id: Option<&RoleId>,
) -> GrantableSet {
    let mut grantable = GrantableSet {
        unrestricted: holds_every_wildcard(caller_items),
        ..GrantableSet::default()
    };

    for role in caller_roles
        .iter()
        .filter(|role| !role.lifecycle().is_deleted())
    {
        grantable
            .permission_ids
            .extend(role.permission_ids().iter().cloned());
        grantable
            .role_ids
            .extend(role.delegated_role_ids().iter().cloned());
    }

    grantable.item_ids.extend(
        caller_items
            .iter()
            .filter(|item| !item.lifecycle().is_deleted())
            .map(|item| item.id().clone()),
    );

    if let Some(default_role_id) = default_role_id {
        grantable.role_ids.insert(default_role_id.clone());
    }

    grantable
}

fn holds_every_wildcard(items: &[Item]) -> bool {
    HTTP_METHODS.iter().all(|method| {
        items
            .iter()
            .any(|item| item.wildcard_method() == Some(*method))
    })
}

/// Gate run before any request that hands authority to someone else.
///
/// Covers user-role assignments, role permission lists, role delegation
/// lists and permission item lists, for grants and revokes alike. A request
/// passes only when the whole requested set is grantable; nothing is applied
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainmentCheck {
    default_role_id: Option<RoleId>,
}

impl ContainmentCheck {
    /// Creates a check; `default_role_id` is grantable by every caller.
    #[must_use]
    pub fn new(default_role_id: Option<RoleId>) -> Self {
        Self { default_role_id }
    }

    /// Returns the caller's grantable set.
    #[must_use]
    pub fn grantable(&self, authority: &CallerAuthority) -> GrantableSet {
        grantable_set(
            &authority.roles,
            &authority.items,
            self.default_role_id.as_ref(),
        )
    }

    /// Fails with `Forbidden` unless every requested role id is grantable.
    pub fn ensure_roles(
        &self,
        caller_id: &str,
        authority: &CallerAuthority,
        requested: &[RoleId],
    ) -> AppResult<()> {
        let grantable = self.grantable(authority);
        let denied = grantable.denied(grantable.role_ids(), requested);
        reject_denied(caller_id, "roles", denied.into_iter().map(RoleId::as_str))
    }

    /// Fails with `Forbidden` unless every requested permission id is grantable.
    pub fn ensure_permissions(
        &self,
        caller_id: &str,
        authority: &CallerAuthority,
        requested: &[PermissionId],
    ) -> AppResult<()> {
        let grantable = self.grantable(authority);
        let denied = grantable.denied(grantable.permission_ids(), requested);
        reject_denied(
            caller_id,
            "permissions",
            denied.into_iter().map(PermissionId::as_str),
        )
    }

    /// Fails with `Forbidden` unless every requested item id is grantable.
    pub fn ensure_items(
        &self,
        caller_id: &str,
        authority: &CallerAuthority,
        requested: &[ItemId],
    ) -> AppResult<()> {
        let grantable = self.grantable(authority);
        let denied = grantable.denied(grantable.item_ids(), requested);
        reject_denied(caller_id, "items", denied.into_iter().map(ItemId::as_str))
    }
}

fn reject_denied<'a>(
    caller_id: &str,
    kind: &str,
    denied: impl Iterator<Item = &'a str>,
) -> AppResult<()> {
    let denied = denied.collect::<Vec<_>>();
    if denied.is_empty() {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "caller '{caller_id}' cannot grant or revoke {kind} [{}]",
        denied.join(", ")
    )))
}
