//! Cart maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! souq-cli carts prune --older-than-days 30
//! ```

use chrono::{Duration, Utc};

use souq_storefront::db::PgCartStore;

use super::{CliError, connect, store_currency};

/// Delete guest carts created more than `older_than_days` days ago.
///
/// User carts are never pruned.
///
/// # Errors
///
/// Returns `CliError::Invalid` for a zero age, or an error if the database is
/// unreachable.
pub async fn prune(older_than_days: u32) -> Result<(), CliError> {
    if older_than_days == 0 {
        return Err(CliError::Invalid(
            "--older-than-days must be at least 1".to_owned(),
        ));
    }

    let pool = connect().await?;
    let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));

    let deleted = PgCartStore::new(&pool, store_currency()?)
        .delete_stale_guest_carts(cutoff)
        .await?;

    tracing::info!(deleted, %cutoff, "Pruned guest carts");
    Ok(())
}
