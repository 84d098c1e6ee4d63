//! CLI command implementations.
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (falling back to
//! `DATABASE_URL`) after loading `.env`.

pub mod carts;
pub mod migrate;
pub mod orders;
pub mod seed;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use souq_core::CurrencyCode;
use souq_storefront::config::ConfigError;
use souq_storefront::db::{self, RepositoryError};
use souq_storefront::services::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Environment variable has an unusable value.
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Account operation failed.
    #[error("Account error: {0}")]
    Auth(#[from] AuthError),

    /// Input file could not be read.
    #[error("Could not read {0}: {1}")]
    Io(String, std::io::Error),

    /// Input file is not valid YAML for the expected shape.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Connect to the storefront database.
async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Store currency from `STORE_CURRENCY`.
fn store_currency() -> Result<CurrencyCode, CliError> {
    std::env::var("STORE_CURRENCY").map_or(Ok(CurrencyCode::default()), |code| {
        code.parse()
            .map_err(|e| CliError::InvalidEnvVar("STORE_CURRENCY", e))
    })
}
