//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod history;
mod id_set;
mod ids;
mod item;
mod lifecycle;
mod permission;
mod role;

pub use assignment::UserRoleAssignment;
pub use history::{History, HistoryEntry};
pub use id_set::{dedup_ids, difference_ids, union_ids};
pub use ids::{AssignmentId, ItemId, PermissionId, RoleId};
pub use item::{ADMIN_ITEM_PREFIX, HTTP_METHODS, Item, ItemInput, admin_item_name};
pub use lifecycle::{Lifecycle, Provenance};
pub use permission::{Permission, PermissionInput};
pub use role::{Role, RoleInput};
