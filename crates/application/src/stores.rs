use std::sync::Arc;

use rolegate_domain::{Item, Permission, Role, UserRoleAssignment};

use crate::DocumentStore;

/// Store handles for every collection of the permission graph.
#[derive(Clone)]
pub struct AccessStores {
    /// Item collection.
    pub items: Arc<dyn DocumentStore<Item>>,
    /// Permission collection.
    pub permissions: Arc<dyn DocumentStore<Permission>>,
    /// Role collection.
    pub roles: Arc<dyn DocumentStore<Role>>,
    /// User-role assignment collection.
    pub user_roles: Arc<dyn DocumentStore<UserRoleAssignment>>,
}
