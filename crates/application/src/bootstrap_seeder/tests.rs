use std::collections::HashSet;

use rolegate_core::{Actor, AppError};
use rolegate_domain::{HTTP_METHODS, Item, ItemId, PermissionId, Provenance, Role, RoleId};

use crate::test_support::{
    ADMIN_ROLE_NAME, DEFAULT_ROLE_NAME, entry, fake_stores, insert_role, surface,
};
use crate::{AccessStores, ApiOperation, DocumentQuery, MAX_PAGE_SIZE, PermissionGraph};

use super::{
    ADMIN_PERMISSION_NAME, BootstrapSeeder, DEFAULT_PERMISSION_NAME, SUPERUSER_PERMISSION_NAME,
    SeedConfig,
};

fn config(default_role_id: RoleId) -> SeedConfig {
    SeedConfig {
        default_role_id,
        admin_role_name: ADMIN_ROLE_NAME.to_owned(),
    }
}

fn everything() -> DocumentQuery {
    DocumentQuery::new()
        .paginate(1, MAX_PAGE_SIZE)
        .unwrap_or_else(|_| unreachable!())
}

async fn counts(stores: &AccessStores) -> (u64, u64, u64) {
    let items = stores.items.find(&everything()).await;
    let permissions = stores.permissions.find(&everything()).await;
    let roles = stores.roles.find(&everything()).await;
    (
        items.map(|page| page.total).unwrap_or_default(),
        permissions.map(|page| page.total).unwrap_or_default(),
        roles.map(|page| page.total).unwrap_or_default(),
    )
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let seeder = BootstrapSeeder::new(stores.clone(), surface());
    let config = config(default_role.id().clone());

    let first = seeder.seed(&config).await.unwrap_or_else(|_| unreachable!());
    let after_first = counts(&stores).await;
    let second = seeder.seed(&config).await.unwrap_or_else(|_| unreachable!());
    let third = seeder.seed(&config).await.unwrap_or_else(|_| unreachable!());

    let item_count = ApiOperation::ALL.len() + HTTP_METHODS.len();
    assert_eq!(after_first, (item_count as u64, 3, 2));
    assert_eq!(counts(&stores).await, after_first);
    assert_eq!(first.created, item_count + 4);
    assert_eq!(first.updated, 1);
    assert_eq!((second.created, second.updated), (0, 0));
    assert_eq!(second.admin_item_ids, first.admin_item_ids);
    assert_eq!(third.admin_permission_id, first.admin_permission_id);
    assert_eq!(third.superuser_permission_id, first.superuser_permission_id);
    assert_eq!(third.admin_role_id, first.admin_role_id);
}

#[tokio::test]
async fn bundles_hold_unique_ids() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let seeder = BootstrapSeeder::new(stores.clone(), surface());
    let report = seeder
        .seed(&config(default_role.id().clone()))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(seeder.seed(&config(default_role.id().clone())).await.is_ok());

    let admin_permission = stores
        .permissions
        .find_by_key(ADMIN_PERMISSION_NAME)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let unique = admin_permission
        .item_ids()
        .iter()
        .collect::<HashSet<_>>();
    assert_eq!(unique.len(), admin_permission.item_ids().len());
    assert_eq!(unique.len(), ApiOperation::ALL.len());

    let default_role = stores
        .roles
        .find_by_id(report.default_role_id.as_str())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(default_role.permission_ids(), &[report.default_permission_id.clone()]);
    assert_eq!(default_role.lifecycle().provenance(), Some(Provenance::User));
}

#[tokio::test]
async fn missing_default_role_is_fatal() {
    let stores = fake_stores();
    let seeder = BootstrapSeeder::new(stores, surface());

    let result = seeder.seed(&config(RoleId::new("absent"))).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn default_role_is_resolved_by_name_and_never_created() {
    let stores = fake_stores();
    let seeder = BootstrapSeeder::new(stores.clone(), surface());

    let missing = seeder.resolve_default_role(DEFAULT_ROLE_NAME).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    assert_eq!(counts(&stores).await, (0, 0, 0));

    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let resolved = seeder.resolve_default_role(DEFAULT_ROLE_NAME).await;
    assert!(matches!(resolved, Ok(role_id) if &role_id == default_role.id()));
}

#[tokio::test]
async fn reseeding_keeps_user_added_members() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let seeder = BootstrapSeeder::new(stores.clone(), surface());
    let config = config(default_role.id().clone());
    assert!(seeder.seed(&config).await.is_ok());

    let mut permission = stores
        .permissions
        .find_by_key(DEFAULT_PERMISSION_NAME)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let mut item_ids = permission.item_ids().to_vec();
    item_ids.push(ItemId::new("custom"));
    assert!(
        permission
            .replace_item_ids(
                item_ids,
                entry(&Actor::new("admin", "Administrator"), "granted items"),
            )
            .is_ok()
    );
    assert!(stores.permissions.update(permission).await.is_ok());

    let report = seeder.seed(&config).await.unwrap_or_else(|_| unreachable!());
    let permission = stores
        .permissions
        .find_by_key(DEFAULT_PERMISSION_NAME)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());

    assert_eq!(report.updated, 0);
    assert!(permission.item_ids().contains(&ItemId::new("custom")));
    assert_eq!(permission.item_ids().len(), report.default_item_ids.len() + 1);
}

#[tokio::test]
async fn legacy_items_are_adopted_without_other_changes() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let legacy = serde_json::from_value::<Item>(serde_json::json!({
        "id": "legacy-read-self",
        "name": ApiOperation::ReadSelf.item_name(),
        "method": "GET",
        "path": "/legacy/me",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    }))
    .unwrap_or_else(|_| unreachable!());
    assert!(stores.items.insert(legacy).await.is_ok());

    let seeder = BootstrapSeeder::new(stores.clone(), surface());
    let report = seeder
        .seed(&config(default_role.id().clone()))
        .await
        .unwrap_or_else(|_| unreachable!());

    let adopted = stores
        .items
        .find_by_id("legacy-read-self")
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(adopted.lifecycle().provenance(), Some(Provenance::System));
    assert_eq!(adopted.path(), "/legacy/me");
    assert_eq!(adopted.lifecycle().history().len(), 1);
    assert!(report.default_item_ids.contains(adopted.id()));
}

#[tokio::test]
async fn admin_role_delegates_the_default_role() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let report = BootstrapSeeder::new(stores.clone(), surface())
        .seed(&config(default_role.id().clone()))
        .await
        .unwrap_or_else(|_| unreachable!());

    let view = PermissionGraph::new(stores)
        .resolve_role(&report.admin_role_id, true)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());

    assert!(view.role.lifecycle().is_system());
    assert_eq!(view.delegated_roles.len(), 1);
    assert_eq!(view.delegated_roles[0].name, DEFAULT_ROLE_NAME);
    let names = view
        .permissions
        .unwrap_or_default()
        .iter()
        .map(|permission| permission.name().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, [ADMIN_PERMISSION_NAME, SUPERUSER_PERMISSION_NAME]);
}

#[tokio::test]
async fn superuser_bundle_holds_one_wildcard_per_method() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let report = BootstrapSeeder::new(stores.clone(), surface())
        .seed(&config(default_role.id().clone()))
        .await
        .unwrap_or_else(|_| unreachable!());

    let items = PermissionGraph::new(stores)
        .active_items(&report.wildcard_item_ids)
        .await
        .unwrap_or_else(|_| unreachable!());
    let methods = items
        .iter()
        .filter_map(Item::wildcard_method)
        .collect::<HashSet<_>>();

    assert_eq!(items.len(), HTTP_METHODS.len());
    assert_eq!(methods, HTTP_METHODS.into_iter().collect::<HashSet<_>>());
    assert!(items.iter().all(|item| item.lifecycle().is_system()));
    assert!(!report.admin_item_ids.iter().any(|id| report.wildcard_item_ids.contains(id)));
}

#[tokio::test]
async fn legacy_admin_role_gains_one_history_entry_per_write() {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let legacy = serde_json::from_value::<Role>(serde_json::json!({
        "id": "legacy-admin",
        "name": ADMIN_ROLE_NAME,
        "permissionIds": ["custom-permission"],
        "history": [{
            "actorId": "u1",
            "actorName": "alice",
            "action": "created role",
            "recordedAt": "2024-01-01T00:00:00Z"
        }],
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    }))
    .unwrap_or_else(|_| unreachable!());
    assert!(stores.roles.insert(legacy).await.is_ok());

    let seeder = BootstrapSeeder::new(stores.clone(), surface());
    let report = seeder
        .seed(&config(default_role.id().clone()))
        .await
        .unwrap_or_else(|_| unreachable!());
    let reconciled = stores
        .roles
        .find_by_id("legacy-admin")
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());

    assert_eq!(reconciled.lifecycle().provenance(), Some(Provenance::System));
    assert_eq!(reconciled.lifecycle().history().len(), 2);
    assert_eq!(
        reconciled.permission_ids(),
        &[
            PermissionId::new("custom-permission"),
            report.admin_permission_id.clone(),
            report.superuser_permission_id.clone(),
        ]
    );
    assert_eq!(reconciled.delegated_role_ids(), &[default_role.id().clone()]);

    assert!(seeder.seed(&config(default_role.id().clone())).await.is_ok());
    let unchanged = stores
        .roles
        .find_by_id("legacy-admin")
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(unchanged.lifecycle().history().len(), 2);
}
