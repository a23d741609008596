use super::*;

use rolegate_domain::{RoleId, UserRoleAssignment};
use tracing::info;

use crate::UserRolesView;
use crate::user_history_ports::mirror_user_history;

impl AccessAdminService {
    /// Grants roles to a user, creating the assignment on first grant.
    ///
    /// The caller may only grant roles within its grantable set.
    pub async fn grant_user_roles(
        &self,
        actor: &Actor,
        user_id: &str,
        role_ids: &[RoleId],
    ) -> AppResult<UserRoleAssignment> {
        let user_id = normalize_user_id(user_id)?;
        let authority = self
            .require(actor, ApiOperation::GrantUserRoles, None)
            .await?;
        self.containment
            .ensure_roles(actor.user_id(), &authority, role_ids)?;
        self.ensure_roles_active(role_ids).await?;

        let assignment = self.user_roles.grant(user_id, role_ids, actor).await?;
        self.mirror_last_entry(&assignment).await;

        info!(user_id, granted = role_ids.len(), actor = actor.user_id(), "roles granted");
        Ok(assignment)
    }

    /// Revokes roles from a user; the assignment is kept even when emptied.
    ///
    /// The caller may only revoke roles within its grantable set.
    pub async fn revoke_user_roles(
        &self,
        actor: &Actor,
        user_id: &str,
        role_ids: &[RoleId],
    ) -> AppResult<UserRoleAssignment> {
        let user_id = normalize_user_id(user_id)?;
        let authority = self
            .require(actor, ApiOperation::RevokeUserRoles, None)
            .await?;
        self.containment
            .ensure_roles(actor.user_id(), &authority, role_ids)?;

        let assignment = self.user_roles.revoke(user_id, role_ids, actor).await?;
        self.mirror_last_entry(&assignment).await;

        info!(user_id, revoked = role_ids.len(), actor = actor.user_id(), "roles revoked");
        Ok(assignment)
    }

    /// Returns a user's assignment, with active roles when `expand` is set.
    ///
    /// Users may always read their own roles.
    pub async fn get_user_roles(
        &self,
        actor: &Actor,
        user_id: &str,
        expand: bool,
    ) -> AppResult<Option<UserRolesView>> {
        let user_id = normalize_user_id(user_id)?;
        if actor.user_id() != user_id {
            self.require(actor, ApiOperation::GetUserRoles, Some(user_id))
                .await?;
        }

        self.graph.resolve_user_roles(user_id, expand).await
    }

    /// Returns one page of assignments matching the query.
    pub async fn search_user_roles(
        &self,
        actor: &Actor,
        query: &DocumentQuery,
    ) -> AppResult<Page<UserRoleAssignment>> {
        self.require(actor, ApiOperation::SearchUserRoles, None)
            .await?;
        search(&self.stores.user_roles, query).await
    }

    async fn mirror_last_entry(&self, assignment: &UserRoleAssignment) {
        if let Some(entry) = assignment.history().last() {
            mirror_user_history(&self.user_history, assignment.user_id(), entry.clone()).await;
        }
    }
}

/// Trims the user id the way assignments store it; blank ids are rejected.
fn normalize_user_id(user_id: &str) -> AppResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::Validation("user id is required".to_owned()));
    }

    Ok(user_id)
}
