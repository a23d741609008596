use super::*;

use rolegate_domain::{ItemId, Permission, PermissionId, PermissionInput, Provenance};
use tracing::info;

use crate::PermissionView;

impl AccessAdminService {
    /// Creates a user-provenance permission listing `item_ids`.
    pub async fn create_permission(
        &self,
        actor: &Actor,
        input: PermissionInput,
        item_ids: Vec<ItemId>,
    ) -> AppResult<Permission> {
        let authority = self
            .require(actor, ApiOperation::CreatePermission, None)
            .await?;
        self.containment
            .ensure_items(actor.user_id(), &authority, &item_ids)?;
        self.ensure_items_active(&item_ids).await?;

        let permission = Permission::new(
            PermissionId::generate(),
            input,
            item_ids,
            Provenance::User,
            history_entry(actor, "created permission"),
        )?;
        let permission = self.stores.permissions.insert(permission).await?;

        info!(
            permission_id = %permission.id(),
            name = permission.name(),
            actor = actor.user_id(),
            "permission created"
        );
        Ok(permission)
    }

    /// Replaces a permission's descriptive fields.
    pub async fn update_permission(
        &self,
        actor: &Actor,
        permission_id: &PermissionId,
        input: PermissionInput,
    ) -> AppResult<Permission> {
        self.require(
            actor,
            ApiOperation::UpdatePermission,
            Some(permission_id.as_str()),
        )
        .await?;

        let mut permission = self.load_permission(permission_id).await?;
        ensure_rename_allowed(
            permission.lifecycle(),
            "permission",
            permission.name(),
            input.name.as_str(),
        )?;

        permission.apply_update(input, history_entry(actor, "updated permission"))?;
        self.stores.permissions.update(permission).await
    }

    /// Soft-deletes a permission; roles keep referencing its id.
    pub async fn delete_permission(
        &self,
        actor: &Actor,
        permission_id: &PermissionId,
    ) -> AppResult<Permission> {
        self.require(
            actor,
            ApiOperation::DeletePermission,
            Some(permission_id.as_str()),
        )
        .await?;

        let mut permission = self.load_permission(permission_id).await?;
        ensure_not_system(permission.lifecycle(), "permission", permission_id)?;

        permission
            .lifecycle_mut()
            .mark_deleted(history_entry(actor, "deleted permission"))?;
        let permission = self.stores.permissions.update(permission).await?;

        info!(permission_id = %permission_id, actor = actor.user_id(), "permission deleted");
        Ok(permission)
    }

    /// Returns a permission, with its active items when `expand` is set.
    pub async fn get_permission(
        &self,
        actor: &Actor,
        permission_id: &PermissionId,
        expand: bool,
    ) -> AppResult<Option<PermissionView>> {
        self.require(
            actor,
            ApiOperation::GetPermission,
            Some(permission_id.as_str()),
        )
        .await?;
        self.graph.resolve_permission(permission_id, expand).await
    }

    /// Adds active items to a permission.
    ///
    /// The caller may only add items within its grantable set.
    pub async fn add_permission_items(
        &self,
        actor: &Actor,
        permission_id: &PermissionId,
        item_ids: &[ItemId],
    ) -> AppResult<Permission> {
        let authority = self
            .require(
                actor,
                ApiOperation::AddPermissionItems,
                Some(permission_id.as_str()),
            )
            .await?;
        self.containment
            .ensure_items(actor.user_id(), &authority, item_ids)?;
        self.ensure_items_active(item_ids).await?;

        self.permission_items
            .grant(permission_id.as_str(), item_ids, actor)
            .await
    }

    /// Removes items from a permission, including ids of deleted items.
    ///
    /// The caller may only remove items within its grantable set.
    pub async fn remove_permission_items(
        &self,
        actor: &Actor,
        permission_id: &PermissionId,
        item_ids: &[ItemId],
    ) -> AppResult<Permission> {
        let authority = self
            .require(
                actor,
                ApiOperation::RemovePermissionItems,
                Some(permission_id.as_str()),
            )
            .await?;
        self.containment
            .ensure_items(actor.user_id(), &authority, item_ids)?;

        self.permission_items
            .revoke(permission_id.as_str(), item_ids, actor)
            .await
    }

    /// Returns one page of permissions matching the query.
    pub async fn search_permissions(
        &self,
        actor: &Actor,
        query: &DocumentQuery,
    ) -> AppResult<Page<Permission>> {
        self.require(actor, ApiOperation::SearchPermissions, None)
            .await?;
        search(&self.stores.permissions, query).await
    }

    async fn load_permission(&self, permission_id: &PermissionId) -> AppResult<Permission> {
        self.stores
            .permissions
            .find_by_id(permission_id.as_str())
            .await?
            .ok_or_else(|| not_found("permission", permission_id))
    }

    async fn ensure_items_active(&self, item_ids: &[ItemId]) -> AppResult<()> {
        let found = self.graph.active_items(&dedup_ids(item_ids)).await?;
        ensure_all_found("items", item_ids, found.iter().map(|item| item.id().clone()))
    }
}
