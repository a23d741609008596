use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use rolegate_core::{Actor, AppError, AppResult};
use rolegate_domain::{
    AssignmentId, HistoryEntry, Provenance, Role, RoleId, RoleInput, UserRoleAssignment,
};

use crate::{
    AccessStores, ApiSurface, BootstrapSeeder, Document, DocumentQuery, DocumentStore, Page,
    SeedConfig, SeedReport, UserHistoryRepository,
};

pub(crate) const DEFAULT_ROLE_NAME: &str = "registered-user-default";
pub(crate) const ADMIN_ROLE_NAME: &str = "api-administrator";

/// Vector-backed store mirroring the revision and unique key rules of real stores.
pub(crate) struct FakeDocumentStore<D> {
    documents: Mutex<Vec<D>>,
}

impl<D> Default for FakeDocumentStore<D> {
    fn default() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for FakeDocumentStore<D> {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<D>> {
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .find(|document| document.document_id() == id)
            .cloned())
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<D>> {
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .find(|document| document.unique_key() == key)
            .cloned())
    }

    async fn insert(&self, mut document: D) -> AppResult<D> {
        let mut documents = self.documents.lock().await;
        if documents.iter().any(|stored| {
            stored.document_id() == document.document_id()
                || stored.unique_key() == document.unique_key()
        }) {
            return Err(AppError::Conflict("duplicate document".to_owned()));
        }

        document.set_revision(1);
        documents.push(document.clone());
        Ok(document)
    }

    async fn update(&self, mut document: D) -> AppResult<D> {
        let mut documents = self.documents.lock().await;
        if documents.iter().any(|stored| {
            stored.document_id() != document.document_id()
                && stored.unique_key() == document.unique_key()
        }) {
            return Err(AppError::Conflict("duplicate unique key".to_owned()));
        }

        let stored = documents
            .iter_mut()
            .find(|stored| stored.document_id() == document.document_id())
            .ok_or_else(|| AppError::NotFound("document".to_owned()))?;
        if stored.revision() != document.revision() {
            return Err(AppError::Conflict("stale revision".to_owned()));
        }

        document.set_revision(document.revision() + 1);
        *stored = document.clone();
        Ok(document)
    }

    async fn find(&self, query: &DocumentQuery) -> AppResult<Page<D>> {
        let documents = self.documents.lock().await;
        let matching = documents
            .iter()
            .rev()
            .filter(|document| query.matches(*document))
            .collect::<Vec<_>>();

        Ok(Page {
            total: matching.len() as u64,
            page: query.page(),
            size: query.size(),
            data: matching
                .into_iter()
                .skip((query.page() as usize - 1) * query.size() as usize)
                .take(query.size() as usize)
                .cloned()
                .collect(),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeUserHistoryRepository {
    entries: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    failing: bool,
}

impl FakeUserHistoryRepository {
    pub(crate) fn failing() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            failing: true,
        }
    }
}

#[async_trait]
impl UserHistoryRepository for FakeUserHistoryRepository {
    async fn append_user_history(&self, user_id: &str, entry: HistoryEntry) -> AppResult<()> {
        if self.failing {
            return Err(AppError::Store("user history unavailable".to_owned()));
        }

        self.entries
            .lock()
            .await
            .entry(user_id.to_owned())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn list_user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) fn fake_stores() -> AccessStores {
    AccessStores {
        items: Arc::new(FakeDocumentStore::default()),
        permissions: Arc::new(FakeDocumentStore::default()),
        roles: Arc::new(FakeDocumentStore::default()),
        user_roles: Arc::new(FakeDocumentStore::default()),
    }
}

pub(crate) fn surface() -> ApiSurface {
    ApiSurface::new("/api").unwrap_or_else(|_| unreachable!())
}

pub(crate) fn entry(actor: &Actor, action: &str) -> HistoryEntry {
    HistoryEntry::new(actor, action, Utc::now())
}

/// Inserts a plain role the way the user-account subsystem would.
pub(crate) async fn insert_role(stores: &AccessStores, name: &str) -> Role {
    let role = Role::new(
        RoleId::generate(),
        RoleInput {
            name: name.to_owned(),
            ..RoleInput::default()
        },
        Vec::new(),
        Vec::new(),
        Provenance::User,
        entry(&Actor::system(), "created role"),
    )
    .unwrap_or_else(|_| unreachable!());

    stores
        .roles
        .insert(role)
        .await
        .unwrap_or_else(|_| unreachable!())
}

/// Stores an assignment directly, bypassing the admin API.
pub(crate) async fn assign(stores: &AccessStores, user_id: &str, role_ids: Vec<RoleId>) {
    let mut assignment = UserRoleAssignment::new(AssignmentId::generate(), user_id, Utc::now())
        .unwrap_or_else(|_| unreachable!());
    assignment.replace_role_ids(role_ids, entry(&Actor::system(), "assigned roles"));
    stores
        .user_roles
        .insert(assignment)
        .await
        .unwrap_or_else(|_| unreachable!());
}

/// Seeds the catalog on fake stores and makes `admin` an API administrator.
pub(crate) async fn seeded_stores() -> (AccessStores, SeedReport) {
    let stores = fake_stores();
    let default_role = insert_role(&stores, DEFAULT_ROLE_NAME).await;
    let report = BootstrapSeeder::new(stores.clone(), surface())
        .seed(&SeedConfig {
            default_role_id: default_role.id().clone(),
            admin_role_name: ADMIN_ROLE_NAME.to_owned(),
        })
        .await
        .unwrap_or_else(|_| unreachable!());

    assign(&stores, "admin", vec![report.admin_role_id.clone()]).await;
    (stores, report)
}

pub(crate) fn admin() -> Actor {
    Actor::new("admin", "Administrator")
}
