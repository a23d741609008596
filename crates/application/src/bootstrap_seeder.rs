use chrono::Utc;
use rolegate_core::{Actor, AppError, AppResult};
use rolegate_domain::{
    HTTP_METHODS, HistoryEntry, Item, ItemId, ItemInput, Permission, PermissionId,
    PermissionInput, Provenance, Role, RoleId, RoleInput, admin_item_name, union_ids,
};
use tracing::{debug, info, warn};

use crate::{AccessStores, ApiSurface, Audience};

/// Name of the permission bundling the default user items.
pub const DEFAULT_PERMISSION_NAME: &str = "registered user default permission";

/// Name of the permission bundling every declared item.
pub const ADMIN_PERMISSION_NAME: &str = "role api administration";

/// Name of the permission bundling one `admin:<METHOD>` wildcard item per HTTP method.
///
/// Holders may invoke any operation and grant any id; only the administrator
/// role is seeded with it.
pub const SUPERUSER_PERMISSION_NAME: &str = "unrestricted api access";

/// Values resolved once at startup and passed to the seeder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    /// Id of the role every registered user holds; must already exist.
    pub default_role_id: RoleId,
    /// Name of the API administrator role.
    pub admin_role_name: String,
}

/// Ids reconciled by one seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Items of the default user bundle.
    pub default_item_ids: Vec<ItemId>,
    /// Items of the administrator bundle.
    pub admin_item_ids: Vec<ItemId>,
    /// Wildcard items of the superuser bundle.
    pub wildcard_item_ids: Vec<ItemId>,
    /// Default user permission.
    pub default_permission_id: PermissionId,
    /// Administrator permission.
    pub admin_permission_id: PermissionId,
    /// Superuser permission.
    pub superuser_permission_id: PermissionId,
    /// Default role.
    pub default_role_id: RoleId,
    /// Administrator role.
    pub admin_role_id: RoleId,
    /// Number of documents inserted.
    pub created: usize,
    /// Number of existing documents updated.
    pub updated: usize,
}

impl SeedReport {
    /// Returns the number of system-protected documents reconciled.
    #[must_use]
    pub fn protected_count(&self) -> usize {
        self.default_item_ids.len()
            + self.admin_item_ids.len()
            + self.wildcard_item_ids.len()
            + 5
    }
}

#[derive(Default)]
struct Counters {
    created: usize,
    updated: usize,
}

/// Idempotent startup reconciler for system items, permissions and roles.
///
/// Entities are matched by name. Missing ones are created with system
/// provenance; existing ones only gain missing member ids or a missing
/// provenance, so user edits survive re-runs. Every write appends exactly one
/// history entry, and nothing is written when the store already matches.
#[derive(Clone)]
pub struct BootstrapSeeder {
    stores: AccessStores,
    surface: ApiSurface,
    actor: Actor,
}

impl BootstrapSeeder {
    /// Creates a seeder writing as the system actor.
    #[must_use]
    pub fn new(stores: AccessStores, surface: ApiSurface) -> Self {
        Self {
            stores,
            surface,
            actor: Actor::system(),
        }
    }

    /// Looks up the default role by name.
    ///
    /// The role is owned by the user-account subsystem, so a missing role
    /// fails with `NotFound` instead of being created here.
    pub async fn resolve_default_role(&self, name: &str) -> AppResult<RoleId> {
        let role = self
            .stores
            .roles
            .find_by_key(name.trim())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "default role '{name}' must be created by the user-account service first"
                ))
            })?;

        if role.lifecycle().is_deleted() {
            warn!(role_id = %role.id(), role_name = name, "default role is soft-deleted");
        }

        info!(role_id = %role.id(), role_name = name, "default role resolved");
        Ok(role.id().clone())
    }

    /// Reconciles the declared catalog against the store.
    ///
    /// Fails with `NotFound` when the default role does not exist.
    pub async fn seed(&self, config: &SeedConfig) -> AppResult<SeedReport> {
        let mut counters = Counters::default();

        let default_item_ids = self
            .ensure_items(self.operation_inputs(Audience::DefaultUser), &mut counters)
            .await?;
        let admin_item_ids = self
            .ensure_items(self.operation_inputs(Audience::Administrator), &mut counters)
            .await?;
        let wildcard_item_ids = self.ensure_items(wildcard_inputs(), &mut counters).await?;

        let default_permission_id = self
            .ensure_permission(DEFAULT_PERMISSION_NAME, &default_item_ids, &mut counters)
            .await?;
        let all_item_ids = union_ids(&admin_item_ids, &default_item_ids);
        let admin_permission_id = self
            .ensure_permission(ADMIN_PERMISSION_NAME, &all_item_ids, &mut counters)
            .await?;
        let superuser_permission_id = self
            .ensure_permission(SUPERUSER_PERMISSION_NAME, &wildcard_item_ids, &mut counters)
            .await?;

        self.extend_default_role(config, &default_permission_id, &mut counters)
            .await?;
        let admin_role_id = self
            .ensure_admin_role(
                config,
                &[admin_permission_id.clone(), superuser_permission_id.clone()],
                &mut counters,
            )
            .await?;

        let report = SeedReport {
            default_item_ids,
            admin_item_ids,
            wildcard_item_ids,
            default_permission_id,
            admin_permission_id,
            superuser_permission_id,
            default_role_id: config.default_role_id.clone(),
            admin_role_id,
            created: counters.created,
            updated: counters.updated,
        };

        info!(
            created = report.created,
            updated = report.updated,
            protected = report.protected_count(),
            "access catalog seeded"
        );
        Ok(report)
    }

    fn operation_inputs(&self, audience: Audience) -> Vec<ItemInput> {
        self.surface
            .operations(audience)
            .map(|operation| self.surface.item_input(operation))
            .collect()
    }

    async fn ensure_items(
        &self,
        inputs: Vec<ItemInput>,
        counters: &mut Counters,
    ) -> AppResult<Vec<ItemId>> {
        let mut item_ids = Vec::new();
        for input in inputs {
            let item_id = match self.stores.items.find_by_key(input.name.as_str()).await? {
                Some(mut item) => {
                    if item.lifecycle().is_deleted() {
                        warn!(name = item.name(), "system item is soft-deleted");
                    }

                    let item_id = item.id().clone();
                    if item.lifecycle_mut().adopt_system_provenance() {
                        item.lifecycle_mut()
                            .record(self.entry("adopted item as system"));
                        self.stores.items.update(item).await?;
                        counters.updated += 1;
                    }
                    item_id
                }
                None => {
                    debug!(name = input.name.as_str(), "creating system item");
                    let item = Item::new(
                        ItemId::generate(),
                        input,
                        Provenance::System,
                        self.entry("seeded item"),
                    )?;
                    let item = self.stores.items.insert(item).await?;
                    counters.created += 1;
                    item.id().clone()
                }
            };
            item_ids.push(item_id);
        }

        Ok(item_ids)
    }

    async fn ensure_permission(
        &self,
        name: &str,
        item_ids: &[ItemId],
        counters: &mut Counters,
    ) -> AppResult<PermissionId> {
        let Some(mut permission) = self.stores.permissions.find_by_key(name).await? else {
            let permission = Permission::new(
                PermissionId::generate(),
                PermissionInput {
                    name: name.to_owned(),
                    ..PermissionInput::default()
                },
                item_ids.to_vec(),
                Provenance::System,
                self.entry("seeded permission"),
            )?;
            let permission = self.stores.permissions.insert(permission).await?;
            counters.created += 1;
            return Ok(permission.id().clone());
        };

        let permission_id = permission.id().clone();
        let mut changes = Vec::new();
        if permission.lifecycle_mut().adopt_system_provenance() {
            changes.push("adopted permission as system");
        }

        let merged = union_ids(permission.item_ids(), item_ids);
        let items_missing = merged.len() != permission.item_ids().len();
        if items_missing {
            changes.push("added missing system items");
        }

        if changes.is_empty() {
            return Ok(permission_id);
        }

        let entry = self.entry(changes.join("; ").as_str());
        if items_missing {
            permission.replace_item_ids(merged, entry)?;
        } else {
            permission.lifecycle_mut().record(entry);
        }

        self.stores.permissions.update(permission).await?;
        counters.updated += 1;
        Ok(permission_id)
    }

    async fn extend_default_role(
        &self,
        config: &SeedConfig,
        default_permission_id: &PermissionId,
        counters: &mut Counters,
    ) -> AppResult<()> {
        let role = self
            .stores
            .roles
            .find_by_id(config.default_role_id.as_str())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "default role '{}' must exist before seeding",
                    config.default_role_id
                ))
            })?;

        self.reconcile_role(role, &[default_permission_id.clone()], &[], counters)
            .await
    }

    async fn ensure_admin_role(
        &self,
        config: &SeedConfig,
        permission_ids: &[PermissionId],
        counters: &mut Counters,
    ) -> AppResult<RoleId> {
        let name = config.admin_role_name.as_str();
        let default_role_id = &config.default_role_id;
        let Some(role) = self.stores.roles.find_by_key(name).await? else {
            let role = Role::new(
                RoleId::generate(),
                RoleInput {
                    name: name.to_owned(),
                    ..RoleInput::default()
                },
                permission_ids.to_vec(),
                vec![default_role_id.clone()],
                Provenance::System,
                self.entry("seeded role"),
            )?;
            let role = self.stores.roles.insert(role).await?;
            counters.created += 1;
            return Ok(role.id().clone());
        };

        let role_id = role.id().clone();
        let delegated_role_ids = if &role_id == default_role_id {
            Vec::new()
        } else {
            vec![default_role_id.clone()]
        };
        self.reconcile_role(role, permission_ids, &delegated_role_ids, counters)
            .await?;

        Ok(role_id)
    }

    /// Adopts the role as system and merges missing member ids in one write.
    async fn reconcile_role(
        &self,
        mut role: Role,
        permission_ids: &[PermissionId],
        delegated_role_ids: &[RoleId],
        counters: &mut Counters,
    ) -> AppResult<()> {
        let mut changes = Vec::new();
        if role.lifecycle_mut().adopt_system_provenance() {
            changes.push("adopted role as system");
        }

        let merged_permissions = union_ids(role.permission_ids(), permission_ids);
        let permissions_missing = merged_permissions.len() != role.permission_ids().len();
        if permissions_missing {
            changes.push("added missing system permissions");
        }

        let merged_delegations = union_ids(role.delegated_role_ids(), delegated_role_ids);
        let delegations_missing = merged_delegations.len() != role.delegated_role_ids().len();
        if delegations_missing {
            changes.push("added default role delegation");
        }

        if changes.is_empty() {
            return Ok(());
        }

        let entry = self.entry(changes.join("; ").as_str());
        if permissions_missing || delegations_missing {
            role.replace_members(merged_permissions, merged_delegations, entry)?;
        } else {
            role.lifecycle_mut().record(entry);
        }

        self.stores.roles.update(role).await?;
        counters.updated += 1;
        Ok(())
    }

    fn entry(&self, action: &str) -> HistoryEntry {
        HistoryEntry::new(&self.actor, action, Utc::now())
    }
}

fn wildcard_inputs() -> Vec<ItemInput> {
    HTTP_METHODS
        .iter()
        .map(|method| ItemInput {
            name: admin_item_name(method),
            method: (*method).to_owned(),
            path: "*".to_owned(),
            ..ItemInput::default()
        })
        .collect()
}

#[cfg(test)]
mod tests;
