use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rolegate_core::{Actor, AppError, AppResult};
use rolegate_domain::{
    AssignmentId, HistoryEntry, ItemId, Permission, PermissionId, Role, RoleId,
    UserRoleAssignment, difference_ids, union_ids,
};
use tracing::debug;

use crate::{Document, DocumentStore};

/// How a relation locates its owning document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerLookup {
    /// By document id.
    Id,
    /// By the collection's unique key.
    UniqueKey,
}

/// One many-to-many membership relation edited by id-set algebra.
pub trait Relation: Send + Sync + 'static {
    /// Document owning the member id list.
    type Owner: Document;
    /// Member id type.
    type Member: Clone + Eq + Hash + Display + Send + Sync;

    /// Plural member label used in audit entries.
    const MEMBERS: &'static str;
    /// Owner lookup strategy.
    const LOOKUP: OwnerLookup;

    /// Returns the current member ids.
    fn members(owner: &Self::Owner) -> &[Self::Member];

    /// Replaces member ids and records `entry`.
    fn replace_members(
        owner: &mut Self::Owner,
        members: Vec<Self::Member>,
        entry: HistoryEntry,
    ) -> AppResult<()>;

    /// Creates an empty owner on first grant; `None` when owners must pre-exist.
    fn create_owner(_key: &str, _now: DateTime<Utc>) -> Option<AppResult<Self::Owner>> {
        None
    }
}

/// Permission ↔ Item membership.
pub struct PermissionItems;

impl Relation for PermissionItems {
    type Owner = Permission;
    type Member = ItemId;

    const MEMBERS: &'static str = "items";
    const LOOKUP: OwnerLookup = OwnerLookup::Id;

    fn members(owner: &Permission) -> &[ItemId] {
        owner.item_ids()
    }

    fn replace_members(
        owner: &mut Permission,
        members: Vec<ItemId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        owner.replace_item_ids(members, entry)
    }
}

/// Role ↔ Permission membership.
pub struct RolePermissions;

impl Relation for RolePermissions {
    type Owner = Role;
    type Member = PermissionId;

    const MEMBERS: &'static str = "permissions";
    const LOOKUP: OwnerLookup = OwnerLookup::Id;

    fn members(owner: &Role) -> &[PermissionId] {
        owner.permission_ids()
    }

    fn replace_members(
        owner: &mut Role,
        members: Vec<PermissionId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        owner.replace_permission_ids(members, entry)
    }
}

/// Role ↔ delegated Role list.
pub struct RoleDelegations;

impl Relation for RoleDelegations {
    type Owner = Role;
    type Member = RoleId;

    const MEMBERS: &'static str = "delegated roles";
    const LOOKUP: OwnerLookup = OwnerLookup::Id;

    fn members(owner: &Role) -> &[RoleId] {
        owner.delegated_role_ids()
    }

    fn replace_members(
        owner: &mut Role,
        members: Vec<RoleId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        owner.replace_delegated_role_ids(members, entry)
    }
}

/// User ↔ Role assignment, created on first grant.
pub struct UserRoles;

impl Relation for UserRoles {
    type Owner = UserRoleAssignment;
    type Member = RoleId;

    const MEMBERS: &'static str = "roles";
    const LOOKUP: OwnerLookup = OwnerLookup::UniqueKey;

    fn members(owner: &UserRoleAssignment) -> &[RoleId] {
        owner.role_ids()
    }

    fn replace_members(
        owner: &mut UserRoleAssignment,
        members: Vec<RoleId>,
        entry: HistoryEntry,
    ) -> AppResult<()> {
        owner.replace_role_ids(members, entry);
        Ok(())
    }

    fn create_owner(key: &str, now: DateTime<Utc>) -> Option<AppResult<UserRoleAssignment>> {
        Some(UserRoleAssignment::new(AssignmentId::generate(), key, now))
    }
}

/// Idempotent grant and revoke over one relation.
///
/// The engine does not check that member ids reference existing documents.
/// Each call is a single read-modify-write; a concurrent write to the same
/// owner surfaces as `Conflict` from the store's revision check.
pub struct GrantEngine<R: Relation> {
    store: Arc<dyn DocumentStore<R::Owner>>,
    relation: PhantomData<R>,
}

impl<R: Relation> Clone for GrantEngine<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            relation: PhantomData,
        }
    }
}

impl<R: Relation> GrantEngine<R> {
    /// Creates an engine over the owner collection.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore<R::Owner>>) -> Self {
        Self {
            store,
            relation: PhantomData,
        }
    }

    /// Adds `member_ids` to the owner's set and records one history entry.
    pub async fn grant(
        &self,
        owner_key: &str,
        member_ids: &[R::Member],
        actor: &Actor,
    ) -> AppResult<R::Owner> {
        ensure_members_present::<R>(member_ids)?;
        let now = Utc::now();

        let (mut owner, created) = match self.load(owner_key).await? {
            Some(owner) => (owner, false),
            None => match R::create_owner(owner_key, now) {
                Some(owner) => (owner?, true),
                None => return Err(missing_owner::<R>(owner_key)),
            },
        };

        let members = union_ids(R::members(&owner), member_ids);
        let entry = HistoryEntry::new(
            actor,
            format!("granted {} [{}]", R::MEMBERS, join_ids(member_ids)),
            now,
        );
        R::replace_members(&mut owner, members, entry)?;

        debug!(
            collection = collection_name::<R>(),
            owner = owner_key,
            granted = member_ids.len(),
            created,
            "granting members"
        );

        if created {
            self.store.insert(owner).await
        } else {
            self.store.update(owner).await
        }
    }

    /// Removes `member_ids` from the owner's set and records one history entry.
    ///
    /// Ids not in the set are ignored; an empty result is kept.
    pub async fn revoke(
        &self,
        owner_key: &str,
        member_ids: &[R::Member],
        actor: &Actor,
    ) -> AppResult<R::Owner> {
        ensure_members_present::<R>(member_ids)?;

        let Some(mut owner) = self.load(owner_key).await? else {
            return Err(missing_owner::<R>(owner_key));
        };

        let members = difference_ids(R::members(&owner), member_ids);
        let entry = HistoryEntry::new(
            actor,
            format!("revoked {} [{}]", R::MEMBERS, join_ids(member_ids)),
            Utc::now(),
        );
        R::replace_members(&mut owner, members, entry)?;

        debug!(
            collection = collection_name::<R>(),
            owner = owner_key,
            revoked = member_ids.len(),
            "revoking members"
        );

        self.store.update(owner).await
    }

    async fn load(&self, owner_key: &str) -> AppResult<Option<R::Owner>> {
        match R::LOOKUP {
            OwnerLookup::Id => self.store.find_by_id(owner_key).await,
            OwnerLookup::UniqueKey => self.store.find_by_key(owner_key).await,
        }
    }
}

fn ensure_members_present<R: Relation>(member_ids: &[R::Member]) -> AppResult<()> {
    if member_ids.is_empty() {
        return Err(AppError::Validation(format!(
            "at least one of {} is required",
            R::MEMBERS
        )));
    }

    Ok(())
}

fn missing_owner<R: Relation>(owner_key: &str) -> AppError {
    AppError::NotFound(format!(
        "'{owner_key}' does not exist in '{}'",
        collection_name::<R>()
    ))
}

fn collection_name<R: Relation>() -> &'static str {
    <R::Owner as Document>::COLLECTION.name
}

fn join_ids<T: Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
