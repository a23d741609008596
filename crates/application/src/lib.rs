//! Application services and ports.

#![forbid(unsafe_code)]

mod access_admin_service;
mod api_surface;
mod authorization_service;
mod bootstrap_seeder;
mod containment;
mod document_ports;
mod documents;
mod grant_engine;
mod permission_graph;
mod stores;
mod user_history_ports;

#[cfg(test)]
mod test_support;

pub use access_admin_service::AccessAdminService;
pub use api_surface::{ApiOperation, ApiSurface, Audience, RequestPath};
pub use authorization_service::{AuthorizationService, CallerAuthority};
pub use bootstrap_seeder::{
    ADMIN_PERMISSION_NAME, BootstrapSeeder, DEFAULT_PERMISSION_NAME, SUPERUSER_PERMISSION_NAME,
    SeedConfig, SeedReport,
};
pub use containment::{ContainmentCheck, GrantableSet, grantable_set};
pub use document_ports::{
    CollectionSpec, DEFAULT_PAGE_SIZE, Document, DocumentQuery, DocumentStore, FieldView,
    MAX_PAGE_SIZE, Page, QueryCondition, QueryField, QueryOperator, QueryValue,
};
pub use grant_engine::{
    GrantEngine, OwnerLookup, PermissionItems, Relation, RoleDelegations, RolePermissions,
    UserRoles,
};
pub use permission_graph::{
    DelegatedRole, PermissionGraph, PermissionView, RoleView, UserRolesView,
};
pub use stores::AccessStores;
pub use user_history_ports::UserHistoryRepository;
