use std::sync::Arc;

use async_trait::async_trait;
use rolegate_core::AppResult;
use rolegate_domain::HistoryEntry;
use tracing::warn;

/// Repository port for the audit trail kept on user accounts.
///
/// User accounts live outside this core; role grants and revocations are
/// mirrored into their history as a denormalized copy.
#[async_trait]
pub trait UserHistoryRepository: Send + Sync {
    /// Appends one entry to a user's history.
    async fn append_user_history(&self, user_id: &str, entry: HistoryEntry) -> AppResult<()>;

    /// Lists a user's history in insertion order.
    async fn list_user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>>;
}

/// Mirrors an entry into the user's history without failing the caller.
pub(crate) async fn mirror_user_history(
    repository: &Arc<dyn UserHistoryRepository>,
    user_id: &str,
    entry: HistoryEntry,
) {
    if let Err(error) = repository.append_user_history(user_id, entry).await {
        warn!(%error, user_id, "failed to mirror role change into user history");
    }
}
