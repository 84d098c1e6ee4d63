//! Product domain types.

use souq_core::{Price, ProductId};

/// A catalog product as the cart and checkout see it.
#[derive(Debug, Clone)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// URL slug.
    pub slug: String,
    /// Display name (Arabic).
    pub name: String,
    /// Unit price in the store currency.
    pub price: Price,
    /// Inactive products cannot be added to carts.
    pub is_active: bool,
}
