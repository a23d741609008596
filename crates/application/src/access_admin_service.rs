use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use chrono::Utc;
use rolegate_core::{Actor, AppError, AppResult};
use rolegate_domain::{HistoryEntry, Lifecycle, dedup_ids};

use crate::grant_engine::{PermissionItems, RoleDelegations, RolePermissions, UserRoles};
use crate::{
    AccessStores, ApiOperation, ApiSurface, AuthorizationService, CallerAuthority,
    ContainmentCheck, Document, DocumentQuery, DocumentStore, GrantEngine, Page, PermissionGraph,
    UserHistoryRepository,
};

mod items;
mod permissions;
mod roles;
mod user_roles;

/// Application service exposing administration of the permission graph.
///
/// Every operation first requires the caller to hold an item for the matching
/// [`ApiOperation`]. Edits that hand out roles, permissions or items, on users
/// as well as on roles and permissions, additionally pass the
/// [`ContainmentCheck`].
#[derive(Clone)]
pub struct AccessAdminService {
    authorization_service: AuthorizationService,
    graph: PermissionGraph,
    stores: AccessStores,
    containment: ContainmentCheck,
    user_history: Arc<dyn UserHistoryRepository>,
    permission_items: GrantEngine<PermissionItems>,
    role_permissions: GrantEngine<RolePermissions>,
    role_delegations: GrantEngine<RoleDelegations>,
    user_roles: GrantEngine<UserRoles>,
}

impl AccessAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        stores: AccessStores,
        surface: ApiSurface,
        containment: ContainmentCheck,
        user_history: Arc<dyn UserHistoryRepository>,
    ) -> Self {
        let graph = PermissionGraph::new(stores.clone());

        Self {
            authorization_service: AuthorizationService::new(graph.clone(), surface),
            permission_items: GrantEngine::new(Arc::clone(&stores.permissions)),
            role_permissions: GrantEngine::new(Arc::clone(&stores.roles)),
            role_delegations: GrantEngine::new(Arc::clone(&stores.roles)),
            user_roles: GrantEngine::new(Arc::clone(&stores.user_roles)),
            graph,
            stores,
            containment,
            user_history,
        }
    }

    async fn require(
        &self,
        actor: &Actor,
        operation: ApiOperation,
        target: Option<&str>,
    ) -> AppResult<CallerAuthority> {
        self.authorization_service
            .require_operation(actor, operation, target)
            .await
    }
}

fn history_entry(actor: &Actor, action: impl Into<String>) -> HistoryEntry {
    HistoryEntry::new(actor, action, Utc::now())
}

fn not_found(label: &str, id: impl Display) -> AppError {
    AppError::NotFound(format!("{label} '{id}' does not exist"))
}

/// System-seeded entities keep their name and are never deleted through the API.
fn ensure_not_system(lifecycle: &Lifecycle, label: &str, id: impl Display) -> AppResult<()> {
    if lifecycle.is_system() {
        return Err(AppError::Forbidden(format!(
            "{label} '{id}' is managed by the system"
        )));
    }

    Ok(())
}

fn ensure_rename_allowed(
    lifecycle: &Lifecycle,
    label: &str,
    current_name: &str,
    requested_name: &str,
) -> AppResult<()> {
    if lifecycle.is_system() && current_name != requested_name.trim() {
        return Err(AppError::Forbidden(format!(
            "{label} '{current_name}' is managed by the system and cannot be renamed"
        )));
    }

    Ok(())
}

/// Fails with `Validation` when a requested id has no active counterpart.
fn ensure_all_found<T, F>(label: &str, requested: &[T], found: F) -> AppResult<()>
where
    T: Clone + Eq + Hash + Display,
    F: IntoIterator<Item = T>,
{
    let found = found.into_iter().collect::<HashSet<_>>();
    let missing = dedup_ids(requested)
        .into_iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect::<Vec<_>>();

    if missing.is_empty() {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "unknown or deleted {label} [{}]",
        missing.join(", ")
    )))
}

async fn search<D: Document>(
    store: &Arc<dyn DocumentStore<D>>,
    query: &DocumentQuery,
) -> AppResult<Page<D>> {
    D::COLLECTION.ensure_queryable(query)?;
    store.find(query).await
}
