use std::marker::PhantomData;

use async_trait::async_trait;
use rolegate_application::{
    CollectionSpec, Document, DocumentQuery, DocumentStore, Page, QueryCondition, QueryOperator,
    QueryValue,
};
use rolegate_core::{AppError, AppResult};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;

/// PostgreSQL-backed document store for one collection.
///
/// Each collection is a table named after [`CollectionSpec::name`] holding the
/// serialized document as JSONB next to its id, unique key and revision.
pub struct PostgresDocumentStore<D> {
    pool: PgPool,
    collection: CollectionSpec,
    _document: PhantomData<fn() -> D>,
}

impl<D> Clone for PostgresDocumentStore<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            collection: self.collection,
            _document: PhantomData,
        }
    }
}

impl<D: Document> PostgresDocumentStore<D> {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            collection: D::COLLECTION,
            _document: PhantomData,
        }
    }

    /// Creates the secondary indexes declared by the collection.
    ///
    /// List fields get GIN indexes for membership queries; scalar fields get
    /// expression indexes on their text value.
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let table = self.collection.name;

        for field in self.collection.indexed_fields {
            let key = field.as_str();
            let index_name = format!("{table}_{}_idx", key.to_ascii_lowercase());
            let statement = if field.is_list() {
                format!(
                    "CREATE INDEX IF NOT EXISTS {index_name} ON {table} \
                     USING GIN ((document -> '{key}'))"
                )
            } else {
                format!(
                    "CREATE INDEX IF NOT EXISTS {index_name} ON {table} ((document ->> '{key}'))"
                )
            };

            sqlx::query(statement.as_str())
                .execute(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Store(format!(
                        "failed to create index '{index_name}' on '{table}': {error}"
                    ))
                })?;
        }

        info!(
            collection = table,
            indexes = self.collection.indexed_fields.len(),
            "collection indexes ensured"
        );
        Ok(())
    }

    fn encode(&self, document: &D) -> AppResult<(i64, Value)> {
        let revision = i64::try_from(document.revision()).map_err(|error| {
            AppError::Internal(format!(
                "revision of {} document '{}' is out of range: {error}",
                self.collection.name,
                document.document_id()
            ))
        })?;
        let value = serde_json::to_value(document).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize {} document '{}': {error}",
                self.collection.name,
                document.document_id()
            ))
        })?;

        Ok((revision, value))
    }

    fn decode(&self, row: DocumentRow) -> AppResult<D> {
        let mut document: D = serde_json::from_value(row.document).map_err(|error| {
            AppError::Store(format!(
                "persisted {} document '{}' is invalid: {error}",
                self.collection.name, row.id
            ))
        })?;
        let revision = u64::try_from(row.revision).map_err(|error| {
            AppError::Store(format!(
                "persisted {} document '{}' has a negative revision: {error}",
                self.collection.name, row.id
            ))
        })?;
        document.set_revision(revision);

        Ok(document)
    }

    async fn find_one(&self, column: &str, value: &str) -> AppResult<Option<D>> {
        let table = self.collection.name;
        let statement =
            format!("SELECT id, revision, document FROM {table} WHERE {column} = $1");
        let row = sqlx::query_as::<_, DocumentRow>(statement.as_str())
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Store(format!(
                    "failed to find {table} document by {column} '{value}': {error}"
                ))
            })?;

        row.map(|row| self.decode(row)).transpose()
    }

    fn map_write_error(&self, error: sqlx::Error, document: &D) -> AppError {
        if let sqlx::Error::Database(database_error) = &error
            && database_error.code().as_deref() == Some("23505")
        {
            return AppError::Conflict(format!(
                "{} document '{}' or {} '{}' already exists",
                self.collection.name,
                document.document_id(),
                self.collection.unique_field.as_str(),
                document.unique_key()
            ));
        }

        AppError::Store(format!(
            "failed to write {} document '{}': {error}",
            self.collection.name,
            document.document_id()
        ))
    }
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    revision: i64,
    document: Value,
}

#[async_trait]
impl<D: Document> DocumentStore<D> for PostgresDocumentStore<D> {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<D>> {
        self.find_one("id", id).await
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<D>> {
        self.find_one("unique_key", key).await
    }

    async fn insert(&self, mut document: D) -> AppResult<D> {
        document.set_revision(1);
        let (revision, value) = self.encode(&document)?;
        let statement = format!(
            "INSERT INTO {} (id, unique_key, revision, document) VALUES ($1, $2, $3, $4)",
            self.collection.name
        );

        sqlx::query(statement.as_str())
            .bind(document.document_id())
            .bind(document.unique_key())
            .bind(revision)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|error| self.map_write_error(error, &document))?;

        Ok(document)
    }

    async fn update(&self, mut document: D) -> AppResult<D> {
        let table = self.collection.name;
        let expected = i64::try_from(document.revision()).map_err(|error| {
            AppError::Internal(format!(
                "revision of {table} document '{}' is out of range: {error}",
                document.document_id()
            ))
        })?;
        document.set_revision(document.revision() + 1);
        let (revision, value) = self.encode(&document)?;

        let statement = format!(
            r#"
            UPDATE {table}
            SET unique_key = $2, revision = $3, document = $4, updated_at = now()
            WHERE id = $1 AND revision = $5
            "#
        );
        let result = sqlx::query(statement.as_str())
            .bind(document.document_id())
            .bind(document.unique_key())
            .bind(revision)
            .bind(value)
            .bind(expected)
            .execute(&self.pool)
            .await
            .map_err(|error| self.map_write_error(error, &document))?;

        if result.rows_affected() == 1 {
            return Ok(document);
        }

        let exists_statement = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
        let exists = sqlx::query_scalar::<_, bool>(exists_statement.as_str())
            .bind(document.document_id())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Store(format!(
                    "failed to check {table} document '{}': {error}",
                    document.document_id()
                ))
            })?;

        if exists {
            Err(AppError::Conflict(format!(
                "{table} document '{}' was modified concurrently (expected revision {expected})",
                document.document_id()
            )))
        } else {
            Err(AppError::NotFound(format!(
                "{table} document '{}' does not exist",
                document.document_id()
            )))
        }
    }

    async fn find(&self, query: &DocumentQuery) -> AppResult<Page<D>> {
        let table = self.collection.name;
        let limit = i64::from(query.size());
        let offset = i64::try_from(query.offset()).map_err(|error| {
            AppError::Validation(format!("invalid page offset: {error}"))
        })?;

        let mut count_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
        push_conditions(&mut count_builder, query.conditions());
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Store(format!("failed to count {table} documents: {error}"))
            })?;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT id, revision, document FROM {table}"));
        push_conditions(&mut builder, query.conditions());
        builder.push(" ORDER BY seq DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Store(format!("failed to list {table} documents: {error}"))
            })?;

        let data = rows
            .into_iter()
            .map(|row| self.decode(row))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Page {
            total: u64::try_from(total).unwrap_or_default(),
            page: query.page(),
            size: query.size(),
            data,
        })
    }
}

// Field keys are static identifiers, inlined so the planner can match the
// expression indexes created by `ensure_indexes`.
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, conditions: &[QueryCondition]) {
    for (index, condition) in conditions.iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        let key = condition.field().as_str();

        match (condition.operator(), condition.value()) {
            (QueryOperator::Equals, QueryValue::Bool(expected)) => {
                builder.push(format!("COALESCE((document ->> '{key}')::boolean, false) = "));
                builder.push_bind(*expected);
            }
            (QueryOperator::Equals, QueryValue::Text(expected)) => {
                builder.push(format!("document ->> '{key}' = "));
                builder.push_bind(expected.clone());
            }
            (QueryOperator::Contains, QueryValue::Text(needle)) => {
                builder.push(format!("document ->> '{key}' ILIKE '%' || "));
                builder.push_bind(escape_like(needle));
                builder.push(" || '%'");
            }
            (QueryOperator::Includes, QueryValue::Text(expected)) => {
                builder.push(format!("document -> '{key}' @> jsonb_build_array("));
                builder.push_bind(expected.clone());
                builder.push("::text)");
            }
            (QueryOperator::Contains | QueryOperator::Includes, QueryValue::Bool(_)) => {
                builder.push("FALSE");
            }
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if matches!(character, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}
