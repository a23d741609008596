use rolegate_core::{Actor, AppError, AppResult};
use rolegate_domain::{Item, Role, dedup_ids};
use tracing::debug;

use crate::{ApiOperation, ApiSurface, PermissionGraph, RequestPath};

/// Effective authority of one caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerAuthority {
    /// Non-deleted roles assigned to the caller.
    pub roles: Vec<Role>,
    /// Non-deleted items reachable through those roles' non-deleted permissions.
    pub items: Vec<Item>,
}

impl CallerAuthority {
    /// Returns whether any held item authorizes the request.
    #[must_use]
    pub fn grants(&self, method: &str, path: &RequestPath) -> bool {
        self.items
            .iter()
            .any(|item| item.grants_segments(method, path.segments()))
    }
}

/// Application service deciding whether callers may invoke access operations.
#[derive(Clone)]
pub struct AuthorizationService {
    graph: PermissionGraph,
    surface: ApiSurface,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(graph: PermissionGraph, surface: ApiSurface) -> Self {
        Self { graph, surface }
    }

    /// Resolves the caller's roles and items, re-reading the store.
    pub async fn caller_authority(&self, actor: &Actor) -> AppResult<CallerAuthority> {
        if actor.user_id().trim().is_empty() {
            return Err(AppError::Unauthorized("caller has no user id".to_owned()));
        }

        let roles = self.graph.user_roles(actor.user_id()).await?;

        let mut permission_ids = Vec::new();
        for role in &roles {
            permission_ids.extend(role.permission_ids().iter().cloned());
        }
        let permission_ids = dedup_ids(&permission_ids);

        let mut item_ids = Vec::new();
        for permission in self.graph.active_permissions(&permission_ids).await? {
            item_ids.extend(permission.item_ids().iter().cloned());
        }
        let items = self.graph.active_items(&dedup_ids(&item_ids)).await?;

        Ok(CallerAuthority { roles, items })
    }

    /// Ensures the caller holds an item authorizing the operation on `target`.
    pub async fn require_operation(
        &self,
        actor: &Actor,
        operation: ApiOperation,
        target: Option<&str>,
    ) -> AppResult<CallerAuthority> {
        let path = self.surface.request_path(operation, target)?;
        let authority = self.caller_authority(actor).await?;

        if authority.grants(operation.method(), &path) {
            return Ok(authority);
        }

        debug!(
            user_id = actor.user_id(),
            method = operation.method(),
            path = %path,
            "operation denied"
        );

        Err(AppError::Forbidden(format!(
            "user '{}' may not {} {}",
            actor.user_id(),
            operation.method(),
            path
        )))
    }

    /// Returns whether the caller may invoke the operation on `target`.
    pub async fn has_operation(
        &self,
        actor: &Actor,
        operation: ApiOperation,
        target: Option<&str>,
    ) -> AppResult<bool> {
        let path = self.surface.request_path(operation, target)?;
        let authority = self.caller_authority(actor).await?;
        Ok(authority.grants(operation.method(), &path))
    }
}

#[cfg(test)]
mod tests;
