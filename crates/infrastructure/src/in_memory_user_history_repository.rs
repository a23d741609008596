use std::collections::HashMap;

use async_trait::async_trait;
use rolegate_application::UserHistoryRepository;
use rolegate_core::AppResult;
use rolegate_domain::HistoryEntry;
use tokio::sync::RwLock;

/// In-memory user history repository.
#[derive(Debug, Default)]
pub struct InMemoryUserHistoryRepository {
    entries: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemoryUserHistoryRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserHistoryRepository for InMemoryUserHistoryRepository {
    async fn append_user_history(&self, user_id: &str, entry: HistoryEntry) -> AppResult<()> {
        self.entries
            .write()
            .await
            .entry(user_id.to_owned())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn list_user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
