//! Rolegate bootstrap entry point.

#![forbid(unsafe_code)]

mod bootstrap_config;

use std::sync::Arc;

use rolegate_application::{AccessStores, ApiSurface, BootstrapSeeder, SeedConfig, SeedReport};
use rolegate_core::AppError;
use rolegate_domain::{Item, Permission, Role, UserRoleAssignment};
use rolegate_infrastructure::PostgresDocumentStore;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::bootstrap_config::{BootstrapConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = BootstrapConfig::load()?;
    let surface = ApiSurface::new(config.uri_prefix.as_str())?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    ensure_indexes(&pool).await?;

    if config.migrate_only {
        info!("migrations and indexes applied successfully");
        return Ok(());
    }

    let seeder = BootstrapSeeder::new(build_stores(&pool), surface);
    let default_role_id = seeder
        .resolve_default_role(config.default_role_name.as_str())
        .await?;
    let report = seeder
        .seed(&SeedConfig {
            default_role_id,
            admin_role_name: config.admin_role_name.clone(),
        })
        .await?;

    log_report(&report);
    Ok(())
}

fn build_stores(pool: &PgPool) -> AccessStores {
    AccessStores {
        items: Arc::new(PostgresDocumentStore::new(pool.clone())),
        permissions: Arc::new(PostgresDocumentStore::new(pool.clone())),
        roles: Arc::new(PostgresDocumentStore::new(pool.clone())),
        user_roles: Arc::new(PostgresDocumentStore::new(pool.clone())),
    }
}

async fn ensure_indexes(pool: &PgPool) -> Result<(), AppError> {
    PostgresDocumentStore::<Item>::new(pool.clone())
        .ensure_indexes()
        .await?;
    PostgresDocumentStore::<Permission>::new(pool.clone())
        .ensure_indexes()
        .await?;
    PostgresDocumentStore::<Role>::new(pool.clone())
        .ensure_indexes()
        .await?;
    PostgresDocumentStore::<UserRoleAssignment>::new(pool.clone())
        .ensure_indexes()
        .await
}

fn log_report(report: &SeedReport) {
    info!(
        default_role_id = %report.default_role_id,
        admin_role_id = %report.admin_role_id,
        default_permission_id = %report.default_permission_id,
        admin_permission_id = %report.admin_permission_id,
        superuser_permission_id = %report.superuser_permission_id,
        default_items = report.default_item_ids.len(),
        admin_items = report.admin_item_ids.len(),
        wildcard_items = report.wildcard_item_ids.len(),
        created = report.created,
        updated = report.updated,
        protected = report.protected_count(),
        "bootstrap catalog reconciled"
    );
}
