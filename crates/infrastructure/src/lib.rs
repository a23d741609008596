//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_document_store;
mod in_memory_user_history_repository;
mod postgres_document_store;
mod postgres_user_history_repository;

pub use in_memory_document_store::InMemoryDocumentStore;
pub use in_memory_user_history_repository::InMemoryUserHistoryRepository;
pub use postgres_document_store::PostgresDocumentStore;
pub use postgres_user_history_repository::PostgresUserHistoryRepository;
