use super::*;

use rolegate_domain::{PermissionId, Provenance, Role, RoleId, RoleInput};
use tracing::info;

use crate::RoleView;

impl AccessAdminService {
    /// Creates a user-provenance role holding `permission_ids`.
    pub async fn create_role(
        &self,
        actor: &Actor,
        input: RoleInput,
        permission_ids: Vec<PermissionId>,
    ) -> AppResult<Role> {
        let authority = self.require(actor, ApiOperation::CreateRole, None).await?;
        self.containment
            .ensure_permissions(actor.user_id(), &authority, &permission_ids)?;
        self.ensure_permissions_active(&permission_ids).await?;

        let role = Role::new(
            RoleId::generate(),
            input,
            permission_ids,
            Vec::new(),
            Provenance::User,
            history_entry(actor, "created role"),
        )?;
        let role = self.stores.roles.insert(role).await?;

        info!(role_id = %role.id(), name = role.name(), actor = actor.user_id(), "role created");
        Ok(role)
    }

    /// Replaces a role's descriptive fields.
    pub async fn update_role(
        &self,
        actor: &Actor,
        role_id: &RoleId,
        input: RoleInput,
    ) -> AppResult<Role> {
        self.require(actor, ApiOperation::UpdateRole, Some(role_id.as_str()))
            .await?;

        let mut role = self.load_role(role_id).await?;
        ensure_rename_allowed(role.lifecycle(), "role", role.name(), input.name.as_str())?;

        role.apply_update(input, history_entry(actor, "updated role"))?;
        self.stores.roles.update(role).await
    }

    /// Soft-deletes a role; assignments keep referencing its id.
    pub async fn delete_role(&self, actor: &Actor, role_id: &RoleId) -> AppResult<Role> {
        self.require(actor, ApiOperation::DeleteRole, Some(role_id.as_str()))
            .await?;

        let mut role = self.load_role(role_id).await?;
        ensure_not_system(role.lifecycle(), "role", role_id)?;

        role.lifecycle_mut()
            .mark_deleted(history_entry(actor, "deleted role"))?;
        let role = self.stores.roles.update(role).await?;

        info!(role_id = %role_id, actor = actor.user_id(), "role deleted");
        Ok(role)
    }

    /// Returns a role, with its active permissions when `expand` is set.
    pub async fn get_role(
        &self,
        actor: &Actor,
        role_id: &RoleId,
        expand: bool,
    ) -> AppResult<Option<RoleView>> {
        self.require(actor, ApiOperation::GetRole, Some(role_id.as_str()))
            .await?;
        self.graph.resolve_role(role_id, expand).await
    }

    /// Adds active permissions to a role.
    ///
    /// The caller may only add permissions within its grantable set.
    pub async fn add_role_permissions(
        &self,
        actor: &Actor,
        role_id: &RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<Role> {
        let authority = self
            .require(
                actor,
                ApiOperation::AddRolePermissions,
                Some(role_id.as_str()),
            )
            .await?;
        self.containment
            .ensure_permissions(actor.user_id(), &authority, permission_ids)?;
        self.ensure_permissions_active(permission_ids).await?;

        self.role_permissions
            .grant(role_id.as_str(), permission_ids, actor)
            .await
    }

    /// Removes permissions from a role.
    ///
    /// The caller may only remove permissions within its grantable set.
    pub async fn remove_role_permissions(
        &self,
        actor: &Actor,
        role_id: &RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<Role> {
        let authority = self
            .require(
                actor,
                ApiOperation::RemoveRolePermissions,
                Some(role_id.as_str()),
            )
            .await?;
        self.containment
            .ensure_permissions(actor.user_id(), &authority, permission_ids)?;

        self.role_permissions
            .revoke(role_id.as_str(), permission_ids, actor)
            .await
    }

    /// Lets holders of a role delegate the given active roles.
    ///
    /// The caller may only add roles within its grantable set.
    pub async fn add_delegated_roles(
        &self,
        actor: &Actor,
        role_id: &RoleId,
        delegated_role_ids: &[RoleId],
    ) -> AppResult<Role> {
        let authority = self
            .require(actor, ApiOperation::AddDelegatedRoles, Some(role_id.as_str()))
            .await?;
        self.containment
            .ensure_roles(actor.user_id(), &authority, delegated_role_ids)?;
        self.ensure_roles_active(delegated_role_ids).await?;

        self.role_delegations
            .grant(role_id.as_str(), delegated_role_ids, actor)
            .await
    }

    /// Removes roles from a role's delegation list.
    ///
    /// The caller may only remove roles within its grantable set.
    pub async fn remove_delegated_roles(
        &self,
        actor: &Actor,
        role_id: &RoleId,
        delegated_role_ids: &[RoleId],
    ) -> AppResult<Role> {
        let authority = self
            .require(
                actor,
                ApiOperation::RemoveDelegatedRoles,
                Some(role_id.as_str()),
            )
            .await?;
        self.containment
            .ensure_roles(actor.user_id(), &authority, delegated_role_ids)?;

        self.role_delegations
            .revoke(role_id.as_str(), delegated_role_ids, actor)
            .await
    }

    /// Returns one page of roles matching the query.
    pub async fn search_roles(
        &self,
        actor: &Actor,
        query: &DocumentQuery,
    ) -> AppResult<Page<Role>> {
        self.require(actor, ApiOperation::SearchRoles, None).await?;
        search(&self.stores.roles, query).await
    }

    async fn load_role(&self, role_id: &RoleId) -> AppResult<Role> {
        self.stores
            .roles
            .find_by_id(role_id.as_str())
            .await?
            .ok_or_else(|| not_found("role", role_id))
    }

    async fn ensure_permissions_active(&self, permission_ids: &[PermissionId]) -> AppResult<()> {
        let found = self
            .graph
            .active_permissions(&dedup_ids(permission_ids))
            .await?;
        ensure_all_found(
            "permissions",
            permission_ids,
            found.iter().map(|permission| permission.id().clone()),
        )
    }

    pub(super) async fn ensure_roles_active(&self, role_ids: &[RoleId]) -> AppResult<()> {
        let found = self.graph.active_roles(&dedup_ids(role_ids)).await?;
        ensure_all_found("roles", role_ids, found.iter().map(|role| role.id().clone()))
    }
}
