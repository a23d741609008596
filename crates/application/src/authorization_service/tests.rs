use rolegate_core::{Actor, AppError};
use rolegate_domain::{Permission, PermissionId, PermissionInput, Provenance, admin_item_name};

use crate::test_support::{assign, entry, insert_role, seeded_stores, surface};
use crate::{AccessStores, ApiOperation, PermissionGraph};

use super::AuthorizationService;

fn service(stores: &AccessStores) -> AuthorizationService {
    AuthorizationService::new(PermissionGraph::new(stores.clone()), surface())
}

#[tokio::test]
async fn administrators_may_invoke_declared_operations() {
    let (stores, _) = seeded_stores().await;
    let service = service(&stores);
    let admin = Actor::new("admin", "Administrator");

    let result = service
        .require_operation(&admin, ApiOperation::AddRolePermissions, Some("r1"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn default_users_only_reach_self_service_operations() {
    let (stores, report) = seeded_stores().await;
    assign(&stores, "u1", vec![report.default_role_id.clone()]).await;
    let service = service(&stores);
    let user = Actor::new("u1", "alice");

    let read_self = service
        .has_operation(&user, ApiOperation::ReadSelf, None)
        .await;
    let grant = service
        .require_operation(&user, ApiOperation::GrantUserRoles, None)
        .await;

    assert!(matches!(read_self, Ok(true)));
    assert!(matches!(grant, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn callers_without_assignment_are_forbidden() {
    let (stores, _) = seeded_stores().await;
    let service = service(&stores);

    let result = service
        .require_operation(&Actor::new("stranger", "Stranger"), ApiOperation::GetItem, Some("i1"))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn deleted_items_stop_granting_their_operation() {
    let (stores, report) = seeded_stores().await;
    let mut operator_role = insert_role(&stores, "operator").await;
    assert!(
        operator_role
            .replace_permission_ids(
                vec![report.admin_permission_id.clone()],
                entry(&Actor::system(), "granted permissions"),
            )
            .is_ok()
    );
    assert!(stores.roles.update(operator_role.clone()).await.is_ok());
    assign(&stores, "operator", vec![operator_role.id().clone()]).await;
    let mut item = stores
        .items
        .find_by_key(ApiOperation::SearchRoles.item_name())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert!(
        item.lifecycle_mut()
            .mark_deleted(entry(&Actor::system(), "deleted item"))
            .is_ok()
    );
    assert!(stores.items.update(item).await.is_ok());

    let service = service(&stores);
    let operator = Actor::new("operator", "Operator");
    let search = service
        .has_operation(&operator, ApiOperation::SearchRoles, None)
        .await;
    let get = service
        .has_operation(&operator, ApiOperation::GetRole, Some("r1"))
        .await;
    let superuser_search = service
        .has_operation(&Actor::new("admin", "Administrator"), ApiOperation::SearchRoles, None)
        .await;

    assert!(matches!(search, Ok(false)));
    assert!(matches!(get, Ok(true)));
    assert!(matches!(superuser_search, Ok(true)));
}

#[tokio::test]
async fn admin_wildcard_items_cover_every_path_of_their_method() {
    let (stores, _) = seeded_stores().await;
    let wildcard = stores
        .items
        .find_by_key(admin_item_name("GET").as_str())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let permission = Permission::new(
        PermissionId::generate(),
        PermissionInput {
            name: "read everything".to_owned(),
            ..PermissionInput::default()
        },
        vec![wildcard.id().clone()],
        Provenance::User,
        entry(&Actor::system(), "created permission"),
    )
    .unwrap_or_else(|_| unreachable!());
    let permission = stores
        .permissions
        .insert(permission)
        .await
        .unwrap_or_else(|_| unreachable!());
    let mut reader = insert_role(&stores, "reader").await;
    assert!(
        reader
            .replace_permission_ids(
                vec![permission.id().clone()],
                entry(&Actor::system(), "granted permissions"),
            )
            .is_ok()
    );
    assert!(stores.roles.update(reader.clone()).await.is_ok());
    assign(&stores, "auditor", vec![reader.id().clone()]).await;

    let service = service(&stores);
    let auditor = Actor::new("auditor", "Auditor");

    let read = service
        .has_operation(&auditor, ApiOperation::GetUserRoles, Some("u1"))
        .await;
    let write = service
        .has_operation(&auditor, ApiOperation::CreateRole, None)
        .await;

    assert!(matches!(read, Ok(true)));
    assert!(matches!(write, Ok(false)));
}

#[tokio::test]
async fn target_ids_with_slashes_fill_one_path_segment() {
    let (stores, _) = seeded_stores().await;
    let mut reader = insert_role(&stores, "user role reader").await;
    let read_item = stores
        .items
        .find_by_key(ApiOperation::GetUserRoles.item_name())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let permission = Permission::new(
        PermissionId::generate(),
        PermissionInput {
            name: "read user roles".to_owned(),
            ..PermissionInput::default()
        },
        vec![read_item.id().clone()],
        Provenance::User,
        entry(&Actor::system(), "created permission"),
    )
    .unwrap_or_else(|_| unreachable!());
    let permission = stores
        .permissions
        .insert(permission)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(
        reader
            .replace_permission_ids(
                vec![permission.id().clone()],
                entry(&Actor::system(), "granted permissions"),
            )
            .is_ok()
    );
    assert!(stores.roles.update(reader.clone()).await.is_ok());
    assign(&stores, "helpdesk", vec![reader.id().clone()]).await;

    let service = service(&stores);
    let helpdesk = Actor::new("helpdesk", "Helpdesk");

    let nested = service
        .has_operation(&helpdesk, ApiOperation::GetUserRoles, Some("team/alice"))
        .await;
    let blank = service
        .require_operation(&helpdesk, ApiOperation::GetUserRoles, Some(""))
        .await;

    assert!(matches!(nested, Ok(true)));
    assert!(matches!(blank, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn callers_without_user_id_are_unauthorized() {
    let (stores, _) = seeded_stores().await;

    let result = service(&stores)
        .require_operation(&Actor::new("  ", "Anonymous"), ApiOperation::ReadSelf, None)
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}
