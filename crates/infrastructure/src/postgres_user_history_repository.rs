use async_trait::async_trait;
use rolegate_application::UserHistoryRepository;
use rolegate_core::{AppError, AppResult};
use rolegate_domain::HistoryEntry;
use serde_json::Value;
use sqlx::PgPool;

/// PostgreSQL-backed repository for the history mirrored onto user accounts.
#[derive(Clone)]
pub struct PostgresUserHistoryRepository {
    pool: PgPool,
}

impl PostgresUserHistoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserHistoryRepository for PostgresUserHistoryRepository {
    async fn append_user_history(&self, user_id: &str, entry: HistoryEntry) -> AppResult<()> {
        let entry_json = serde_json::to_value(&entry).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize history entry for user '{user_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_user_history (user_id, entry, recorded_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(entry_json)
        .bind(entry.recorded_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Store(format!(
                "failed to append history for user '{user_id}': {error}"
            ))
        })?;

        Ok(())
    }

    async fn list_user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT entry
            FROM rbac_user_history
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Store(format!(
                "failed to list history for user '{user_id}': {error}"
            ))
        })?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|error| {
                    AppError::Store(format!(
                        "persisted history entry for user '{user_id}' is invalid: {error}"
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rolegate_application::UserHistoryRepository;
    use rolegate_core::Actor;
    use rolegate_domain::{AssignmentId, HistoryEntry};
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use super::PostgresUserHistoryRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres user history tests: {error}");
        }

        Some(pool)
    }

    #[tokio::test]
    async fn appended_entries_list_in_insertion_order() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let repository = PostgresUserHistoryRepository::new(pool);
        let user_id = format!("user-{}", AssignmentId::generate());
        let actor = Actor::new("admin", "Admin");

        for action in ["granted roles [r1, r2]", "revoked roles [r2]"] {
            let appended = repository
                .append_user_history(
                    user_id.as_str(),
                    HistoryEntry::new(&actor, action, Utc::now()),
                )
                .await;
            assert!(appended.is_ok());
        }

        let entries = repository
            .list_user_history(user_id.as_str())
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));
        let actions: Vec<&str> = entries.iter().map(HistoryEntry::action).collect();
        assert_eq!(actions, vec!["granted roles [r1, r2]", "revoked roles [r2]"]);
    }
}
