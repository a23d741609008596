use std::env;

use rolegate_core::AppError;
use tracing_subscriber::EnvFilter;

/// Runtime configuration of the bootstrap binary.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub uri_prefix: String,
    pub default_role_name: String,
    pub admin_role_name: String,
}

impl BootstrapConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => value.trim().parse::<u32>().map_err(|error| {
                AppError::Validation(format!("invalid DATABASE_MAX_CONNECTIONS: {error}"))
            })?,
            Err(_) => 5,
        };
        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_owned(),
            ));
        }

        let uri_prefix = env::var("RBAC_URI_PREFIX").unwrap_or_else(|_| "/api".to_owned());
        let default_role_name = optional_non_empty_env("RBAC_DEFAULT_ROLE_NAME")?
            .unwrap_or_else(|| "registered-user-default".to_owned());
        let admin_role_name = optional_non_empty_env("RBAC_ADMIN_ROLE_NAME")?
            .unwrap_or_else(|| "api-administrator".to_owned());

        if default_role_name == admin_role_name {
            return Err(AppError::Validation(
                "RBAC_DEFAULT_ROLE_NAME and RBAC_ADMIN_ROLE_NAME must differ".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            uri_prefix,
            default_role_name,
            admin_role_name,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_non_empty_env(name: &str) -> Result<Option<String>, AppError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => {
            Err(AppError::Validation(format!("{name} must not be empty")))
        }
        Ok(value) => Ok(Some(value.trim().to_owned())),
        Err(_) => Ok(None),
    }
}
