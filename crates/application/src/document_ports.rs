use async_trait::async_trait;
use rolegate_core::{AppError, AppResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Largest page size accepted by list operations.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Page size used when the caller does not choose one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Document field addressable by queries and index declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryField {
    /// Unique human key of catalog entities.
    Name,
    /// Item HTTP method.
    Method,
    /// Item path pattern.
    Path,
    /// Soft-delete flag.
    Deleted,
    /// Entity provenance.
    Provenance,
    /// Permission member item ids.
    ItemIds,
    /// Role member permission ids.
    PermissionIds,
    /// Role delegation list.
    DelegatedRoleIds,
    /// Assignment user id.
    UserId,
    /// Assignment role ids.
    RoleIds,
}

impl QueryField {
    /// Returns the serialized document key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Method => "method",
            Self::Path => "path",
            Self::Deleted => "deleted",
            Self::Provenance => "provenance",
            Self::ItemIds => "itemIds",
            Self::PermissionIds => "permissionIds",
            Self::DelegatedRoleIds => "delegatedRoleIds",
            Self::UserId => "userId",
            Self::RoleIds => "roleIds",
        }
    }

    /// Returns whether the field holds a list of ids.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::ItemIds | Self::PermissionIds | Self::DelegatedRoleIds | Self::RoleIds
        )
    }
}

/// Comparison applied by one query condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    /// Exact equality.
    Equals,
    /// Case-insensitive substring match on text fields.
    Contains,
    /// List field contains the value.
    Includes,
}

/// Literal compared by a query condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Text literal.
    Text(String),
    /// Boolean literal.
    Bool(bool),
}

/// Borrowed view of one document field, used for in-process query evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldView<'a> {
    /// Text field.
    Text(&'a str),
    /// Boolean field.
    Bool(bool),
    /// List of ids.
    List(Vec<&'a str>),
    /// Field not present on this document.
    Absent,
}

/// One typed filter condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCondition {
    field: QueryField,
    operator: QueryOperator,
    value: QueryValue,
}

impl QueryCondition {
    /// Creates a condition, rejecting operator and value combinations that
    /// cannot apply to the field.
    pub fn new(field: QueryField, operator: QueryOperator, value: QueryValue) -> AppResult<Self> {
        let valid = match (operator, &value) {
            (QueryOperator::Equals, QueryValue::Bool(_)) => field == QueryField::Deleted,
            (QueryOperator::Equals, QueryValue::Text(_)) => {
                !field.is_list() && field != QueryField::Deleted
            }
            (QueryOperator::Contains, QueryValue::Text(_)) => {
                !field.is_list() && field != QueryField::Deleted
            }
            (QueryOperator::Includes, QueryValue::Text(_)) => field.is_list(),
            (QueryOperator::Contains | QueryOperator::Includes, QueryValue::Bool(_)) => false,
        };

        if !valid {
            return Err(AppError::Validation(format!(
                "operator {operator:?} with value {value:?} does not apply to field '{}'",
                field.as_str()
            )));
        }

        Ok(Self {
            field,
            operator,
            value,
        })
    }

    /// Returns the filtered field.
    #[must_use]
    pub fn field(&self) -> QueryField {
        self.field
    }

    /// Returns the comparison operator.
    #[must_use]
    pub fn operator(&self) -> QueryOperator {
        self.operator
    }

    /// Returns the compared literal.
    #[must_use]
    pub fn value(&self) -> &QueryValue {
        &self.value
    }

    /// Evaluates the condition against one field view.
    #[must_use]
    pub fn matches(&self, view: &FieldView<'_>) -> bool {
        match (self.operator, &self.value, view) {
            (QueryOperator::Equals, QueryValue::Text(expected), FieldView::Text(actual)) => {
                expected == actual
            }
            (QueryOperator::Equals, QueryValue::Bool(expected), FieldView::Bool(actual)) => {
                expected == actual
            }
            (QueryOperator::Contains, QueryValue::Text(needle), FieldView::Text(actual)) => actual
                .to_lowercase()
                .contains(needle.to_lowercase().as_str()),
            (QueryOperator::Includes, QueryValue::Text(expected), FieldView::List(values)) => {
                values.iter().any(|value| value == expected)
            }
            _ => false,
        }
    }
}

/// Conjunction of conditions plus offset pagination.
///
/// Results are always ordered newest first by insertion sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    conditions: Vec<QueryCondition>,
    page: u32,
    size: u32,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DocumentQuery {
    /// Creates an unfiltered query for the first page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text equality condition.
    pub fn equals(self, field: QueryField, value: impl Into<String>) -> AppResult<Self> {
        self.with(field, QueryOperator::Equals, QueryValue::Text(value.into()))
    }

    /// Adds a soft-delete flag condition.
    pub fn deleted(self, deleted: bool) -> AppResult<Self> {
        self.with(
            QueryField::Deleted,
            QueryOperator::Equals,
            QueryValue::Bool(deleted),
        )
    }

    /// Adds a case-insensitive substring condition.
    pub fn contains(self, field: QueryField, value: impl Into<String>) -> AppResult<Self> {
        self.with(field, QueryOperator::Contains, QueryValue::Text(value.into()))
    }

    /// Adds a list membership condition.
    pub fn includes(self, field: QueryField, value: impl Into<String>) -> AppResult<Self> {
        self.with(field, QueryOperator::Includes, QueryValue::Text(value.into()))
    }

    /// Adds an arbitrary condition.
    pub fn with(
        mut self,
        field: QueryField,
        operator: QueryOperator,
        value: QueryValue,
    ) -> AppResult<Self> {
        self.conditions.push(QueryCondition::new(field, operator, value)?);
        Ok(self)
    }

    /// Selects a one-based page of `size` documents.
    pub fn paginate(mut self, page: u32, size: u32) -> AppResult<Self> {
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_owned()));
        }

        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        self.page = page;
        self.size = size;
        Ok(self)
    }

    /// Returns all conditions.
    #[must_use]
    pub fn conditions(&self) -> &[QueryCondition] {
        self.conditions.as_slice()
    }

    /// Returns the one-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the number of documents skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    /// Returns whether a document satisfies every condition.
    pub fn matches<D: Document>(&self, document: &D) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(&document.field_view(condition.field())))
    }
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Number of documents matching the filter across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Documents on this page.
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Maps page entries while keeping pagination metadata.
    pub fn map<U>(self, mapper: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page: self.page,
            size: self.size,
            data: self.data.into_iter().map(mapper).collect(),
        }
    }
}

/// Collection name and index declarations of one document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection name in the backing store.
    pub name: &'static str,
    /// Field holding the collection's unique key.
    pub unique_field: QueryField,
    /// Secondary, non-unique indexed fields.
    pub indexed_fields: &'static [QueryField],
}

impl CollectionSpec {
    /// Rejects queries on fields this collection neither indexes nor keys on.
    pub fn ensure_queryable(&self, query: &DocumentQuery) -> AppResult<()> {
        for condition in query.conditions() {
            let field = condition.field();
            if field != self.unique_field && !self.indexed_fields.contains(&field) {
                return Err(AppError::Validation(format!(
                    "field '{}' is not queryable on collection '{}'",
                    field.as_str(),
                    self.name
                )));
            }
        }

        Ok(())
    }
}

/// Persisted aggregate addressable by id and unique key.
pub trait Document: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection and index declarations.
    const COLLECTION: CollectionSpec;

    /// Returns the immutable document id.
    fn document_id(&self) -> &str;

    /// Returns the value of the collection's unique field.
    fn unique_key(&self) -> &str;

    /// Returns the optimistic concurrency revision.
    fn revision(&self) -> u64;

    /// Sets the revision; only stores call this.
    fn set_revision(&mut self, revision: u64);

    /// Returns a field for in-process query evaluation.
    fn field_view(&self, field: QueryField) -> FieldView<'_>;
}

/// Persistence contract for one document collection.
///
/// Lookups return `None` for absent documents. Writes are atomic per document.
#[async_trait]
pub trait DocumentStore<D: Document>: Send + Sync {
    /// Finds a document by id.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<D>>;

    /// Finds a document by its unique key.
    async fn find_by_key(&self, key: &str) -> AppResult<Option<D>>;

    /// Inserts a new document and returns it at revision 1.
    ///
    /// Fails with `Conflict` when the id or unique key is already taken.
    async fn insert(&self, document: D) -> AppResult<D>;

    /// Replaces a document when its revision matches the stored one.
    ///
    /// Returns the document at the next revision. Fails with `NotFound` for an
    /// unknown id and `Conflict` for a stale revision or a taken unique key.
    async fn update(&self, document: D) -> AppResult<D>;

    /// Returns one page of matching documents, newest first.
    async fn find(&self, query: &DocumentQuery) -> AppResult<Page<D>>;
}

#[cfg(test)]
mod tests {
    use rolegate_core::AppError;

    use super::{DocumentQuery, FieldView, QueryCondition, QueryField, QueryOperator, QueryValue};

    #[test]
    fn contains_is_case_insensitive() {
        let condition = QueryCondition::new(
            QueryField::Name,
            QueryOperator::Contains,
            QueryValue::Text("ROLE".to_owned()),
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(condition.matches(&FieldView::Text("search roles")));
        assert!(!condition.matches(&FieldView::Text("search items")));
        assert!(!condition.matches(&FieldView::Absent));
    }

    #[test]
    fn includes_requires_list_field() {
        let invalid = DocumentQuery::new().includes(QueryField::Name, "r1");
        assert!(matches!(invalid, Err(AppError::Validation(_))));

        let condition = QueryCondition::new(
            QueryField::RoleIds,
            QueryOperator::Includes,
            QueryValue::Text("r1".to_owned()),
        )
        .unwrap_or_else(|_| unreachable!());
        assert!(condition.matches(&FieldView::List(vec!["r2", "r1"])));
        assert!(!condition.matches(&FieldView::List(Vec::new())));
    }

    #[test]
    fn deleted_flag_only_compares_booleans() {
        let invalid = DocumentQuery::new().equals(QueryField::Deleted, "true");
        assert!(matches!(invalid, Err(AppError::Validation(_))));
        assert!(DocumentQuery::new().deleted(false).is_ok());
    }

    #[test]
    fn pagination_bounds_are_enforced() {
        assert!(matches!(
            DocumentQuery::new().paginate(0, 10),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            DocumentQuery::new().paginate(1, 501),
            Err(AppError::Validation(_))
        ));

        let query = DocumentQuery::new()
            .paginate(3, 20)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn default_query_is_first_page_of_ten() {
        let query = DocumentQuery::new();
        assert_eq!(query.page(), 1);
        assert_eq!(query.size(), 10);
        assert_eq!(query.offset(), 0);
    }
}
