//! Cart error types.

use thiserror::Error;

use souq_core::{ProductId, QuantityError};

use crate::db::RepositoryError;

/// Errors that can occur during cart operations.
///
/// Missing carts and missing items are not errors: removals and updates on
/// them are no-ops.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity outside `1..=99`.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// Product does not exist or is no longer sold.
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    /// Reading or writing the guest cart token failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error. A failed merge rolls back completely.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
