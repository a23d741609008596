use rolegate_core::AppResult;
use rolegate_domain::{Item, ItemId, Permission, PermissionId, Role, RoleId, UserRoleAssignment};
use serde::Serialize;

use crate::AccessStores;

/// Reference to a role another role's holders may delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedRole {
    /// Delegated role id.
    pub id: RoleId,
    /// Current name of the delegated role.
    pub name: String,
}

/// Permission read model with optional item expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    /// Stored permission.
    #[serde(flatten)]
    pub permission: Permission,
    /// Non-deleted member items, present when expansion was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
}

/// Role read model with optional permission expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    /// Stored role.
    #[serde(flatten)]
    pub role: Role,
    /// Non-deleted member permissions, present when expansion was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    /// Non-deleted roles this role's holders may delegate.
    pub delegated_roles: Vec<DelegatedRole>,
}

/// User-role assignment read model with optional role expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesView {
    /// Stored assignment.
    #[serde(flatten)]
    pub assignment: UserRoleAssignment,
    /// Non-deleted assigned roles, present when expansion was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

/// Read-side aggregation over the Role → Permission → Item graph.
///
/// Every call reads the store; expanded views are never persisted or cached.
/// Ids of missing or soft-deleted members stay in the stored lists but are
/// left out of expanded views.
#[derive(Clone)]
pub struct PermissionGraph {
    stores: AccessStores,
}

impl PermissionGraph {
    /// Creates a graph reader over the given stores.
    #[must_use]
    pub fn new(stores: AccessStores) -> Self {
        Self { stores }
    }

    /// Loads a permission, expanding its items when `expand` is set.
    pub async fn resolve_permission(
        &self,
        permission_id: &PermissionId,
        expand: bool,
    ) -> AppResult<Option<PermissionView>> {
        let Some(permission) = self
            .stores
            .permissions
            .find_by_id(permission_id.as_str())
            .await?
        else {
            return Ok(None);
        };

        let items = if expand {
            Some(self.active_items(permission.item_ids()).await?)
        } else {
            None
        };

        Ok(Some(PermissionView { permission, items }))
    }

    /// Loads a role, expanding its permissions one level when `expand` is set.
    ///
    /// Expanded permissions are not expanded further into items.
    pub async fn resolve_role(
        &self,
        role_id: &RoleId,
        expand: bool,
    ) -> AppResult<Option<RoleView>> {
        let Some(role) = self.stores.roles.find_by_id(role_id.as_str()).await? else {
            return Ok(None);
        };

        let permissions = if expand {
            Some(self.active_permissions(role.permission_ids()).await?)
        } else {
            None
        };
        let delegated_roles = self.delegated_roles(&role).await?;

        Ok(Some(RoleView {
            role,
            permissions,
            delegated_roles,
        }))
    }

    /// Loads a user's assignment, expanding its roles when `expand` is set.
    pub async fn resolve_user_roles(
        &self,
        user_id: &str,
        expand: bool,
    ) -> AppResult<Option<UserRolesView>> {
        let Some(assignment) = self.stores.user_roles.find_by_key(user_id).await? else {
            return Ok(None);
        };

        let roles = if expand {
            Some(self.active_roles(assignment.role_ids()).await?)
        } else {
            None
        };

        Ok(Some(UserRolesView { assignment, roles }))
    }

    /// Resolves the current `{id, name}` of each role a role may delegate.
    pub async fn delegated_roles(&self, role: &Role) -> AppResult<Vec<DelegatedRole>> {
        Ok(self
            .active_roles(role.delegated_role_ids())
            .await?
            .into_iter()
            .map(|delegated| DelegatedRole {
                id: delegated.id().clone(),
                name: delegated.name().to_owned(),
            })
            .collect())
    }

    /// Returns the non-deleted roles among `role_ids`, in list order.
    pub async fn active_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let mut roles = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            let role = self.stores.roles.find_by_id(role_id.as_str()).await?;
            roles.extend(role.filter(|role| !role.lifecycle().is_deleted()));
        }

        Ok(roles)
    }

    /// Returns the non-deleted permissions among `permission_ids`, in list order.
    pub async fn active_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<Permission>> {
        let mut permissions = Vec::with_capacity(permission_ids.len());
        for permission_id in permission_ids {
            let permission = self
                .stores
                .permissions
                .find_by_id(permission_id.as_str())
                .await?;
            permissions.extend(
                permission.filter(|permission| !permission.lifecycle().is_deleted()),
            );
        }

        Ok(permissions)
    }

    /// Returns the non-deleted items among `item_ids`, in list order.
    pub async fn active_items(&self, item_ids: &[ItemId]) -> AppResult<Vec<Item>> {
        let mut items = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            let item = self.stores.items.find_by_id(item_id.as_str()).await?;
            items.extend(item.filter(|item| !item.lifecycle().is_deleted()));
        }

        Ok(items)
    }

    /// Returns the non-deleted roles currently assigned to a user.
    pub async fn user_roles(&self, user_id: &str) -> AppResult<Vec<Role>> {
        match self.stores.user_roles.find_by_key(user_id).await? {
            Some(assignment) => self.active_roles(assignment.role_ids()).await,
            None => Ok(Vec::new()),
        }
    }
}
