//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! souq-cli migrate
//! ```
//!
//! Migrations are embedded from `crates/storefront/migrations/`.

use souq_storefront::db::MIGRATOR;

use super::{CliError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
