use async_trait::async_trait;
use rolegate_application::{Document, DocumentQuery, DocumentStore, Page};
use rolegate_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// In-memory document store for one collection.
///
/// Documents are kept in insertion order; listing walks them newest first.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D> {
    documents: RwLock<Vec<D>>,
}

impl<D> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> InMemoryDocumentStore<D> {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for InMemoryDocumentStore<D> {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<D>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|document| document.document_id() == id)
            .cloned())
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<D>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|document| document.unique_key() == key)
            .cloned())
    }

    async fn insert(&self, mut document: D) -> AppResult<D> {
        let mut documents = self.documents.write().await;

        if documents
            .iter()
            .any(|stored| stored.document_id() == document.document_id())
        {
            return Err(AppError::Conflict(format!(
                "{} document '{}' already exists",
                D::COLLECTION.name,
                document.document_id()
            )));
        }

        if documents
            .iter()
            .any(|stored| stored.unique_key() == document.unique_key())
        {
            return Err(AppError::Conflict(format!(
                "{} '{}' is already taken in {}",
                D::COLLECTION.unique_field.as_str(),
                document.unique_key(),
                D::COLLECTION.name
            )));
        }

        document.set_revision(1);
        documents.push(document.clone());
        Ok(document)
    }

    async fn update(&self, mut document: D) -> AppResult<D> {
        let mut documents = self.documents.write().await;

        if documents.iter().any(|stored| {
            stored.document_id() != document.document_id()
                && stored.unique_key() == document.unique_key()
        }) {
            return Err(AppError::Conflict(format!(
                "{} '{}' is already taken in {}",
                D::COLLECTION.unique_field.as_str(),
                document.unique_key(),
                D::COLLECTION.name
            )));
        }

        let Some(stored) = documents
            .iter_mut()
            .find(|stored| stored.document_id() == document.document_id())
        else {
            return Err(AppError::NotFound(format!(
                "{} document '{}' does not exist",
                D::COLLECTION.name,
                document.document_id()
            )));
        };

        if stored.revision() != document.revision() {
            return Err(AppError::Conflict(format!(
                "{} document '{}' was modified concurrently (expected revision {}, found {})",
                D::COLLECTION.name,
                document.document_id(),
                document.revision(),
                stored.revision()
            )));
        }

        document.set_revision(stored.revision() + 1);
        *stored = document.clone();
        Ok(document)
    }

    async fn find(&self, query: &DocumentQuery) -> AppResult<Page<D>> {
        let documents = self.documents.read().await;
        let matching: Vec<&D> = documents
            .iter()
            .rev()
            .filter(|document| query.matches(*document))
            .collect();

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let data = matching
            .iter()
            .skip(offset)
            .take(query.size() as usize)
            .map(|document| (*document).clone())
            .collect();

        Ok(Page {
            total: matching.len() as u64,
            page: query.page(),
            size: query.size(),
            data,
        })
    }
}
