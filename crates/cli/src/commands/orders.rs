//! Order counter commands.
//!
//! # Usage
//!
//! ```bash
//! souq-cli orders next-number
//! souq-cli orders reset-counter --yes
//! ```

use souq_storefront::config::order_number_format_from_env;
use souq_storefront::db::PgOrderNumberStore;
use souq_storefront::services::OrderNumberSequencer;

use super::{CliError, connect};

/// Log the order number the next checkout would get.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn next_number() -> Result<(), CliError> {
    let pool = connect().await?;
    let format = order_number_format_from_env()?;
    let store = PgOrderNumberStore::new(&pool);

    let next = OrderNumberSequencer::new(&store, &format)
        .get_next_order_number()
        .await?;

    tracing::info!(%next, "Next order number");
    Ok(())
}

/// Reset the order counter so numbering restarts at 1.
///
/// New orders would collide with existing order numbers, so checkout rejects
/// them until the counter passes the highest number in use.
///
/// # Errors
///
/// Returns `CliError::Invalid` without `--yes`, or an error if the database
/// is unreachable.
pub async fn reset_counter(confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::Invalid(
            "resetting the order counter requires --yes".to_owned(),
        ));
    }

    let pool = connect().await?;
    let format = order_number_format_from_env()?;
    let store = PgOrderNumberStore::new(&pool);

    OrderNumberSequencer::new(&store, &format)
        .reset_counter()
        .await?;

    tracing::info!("Order counter reset");
    Ok(())
}
