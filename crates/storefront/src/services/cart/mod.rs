//! Cart resolution and cart operations.
//!
//! [`CartService`] returns the single logical cart for a request. When a
//! shopper who built a guest cart is recognized as a signed-in user, the guest
//! cart is folded into the user's cart in one transaction and the guest token
//! is cleared only after that transaction commits.
//!
//! | Identity | Guest token | Result |
//! |----------|-------------|--------|
//! | user     | none        | user's cart (created lazily on add) |
//! | user     | non-empty cart, user cart exists | merge, delete guest cart |
//! | user     | non-empty cart, no user cart | re-associate guest cart to user |
//! | user     | missing / empty cart | discard, user's cart |
//! | guest    | some        | guest cart, or none if it is gone |
//! | guest    | none        | none |

mod error;
pub mod merge;
mod token;

use std::future::Future;

use tracing::instrument;

use souq_core::{CartId, CartItemId, ProductId, Quantity, UserId};

pub use error::CartError;
pub use merge::{MergePlan, plan_merge};
pub use token::CartToken;

use crate::db::RepositoryError;
use crate::models::{Cart, CartItem, CartView, Product};

/// What happened to a guest cart presented by a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsorbOutcome {
    /// The user had no cart; the guest cart now belongs to them.
    Adopted(Cart),
    /// Guest lines were folded into the user's cart and the guest cart deleted.
    Merged {
        /// The user's cart.
        cart: Cart,
        /// Number of guest lines merged.
        lines: usize,
    },
    /// Nothing to merge (guest cart gone, empty, or already owned); the
    /// user's cart, if any, is returned untouched.
    Discarded(Option<Cart>),
}

impl AbsorbOutcome {
    /// The user's cart after absorption.
    #[must_use]
    pub fn into_cart(self) -> Option<Cart> {
        match self {
            Self::Adopted(cart) | Self::Merged { cart, .. } => Some(cart),
            Self::Discarded(cart) => cart,
        }
    }
}

/// What happened on an item removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// No such item in this cart.
    NotFound,
    /// Item removed; other items remain.
    Removed,
    /// Item removed and, being the last one, the cart was deleted too.
    CartDeleted,
}

/// Persistence for carts.
///
/// Every method that changes more than one row is atomic in the `PostgreSQL`
/// implementation.
pub trait CartStore: Send + Sync {
    /// Look up a cart by ID.
    fn find_cart(
        &self,
        id: CartId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Look up the cart owned by `user_id`.
    fn find_user_cart(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Create a cart. For a user who already has one, returns the existing cart.
    fn create_cart(
        &self,
        user_id: Option<UserId>,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Fold guest cart `guest_id` into `user_id`'s cart in one transaction.
    fn absorb_guest_cart(
        &self,
        guest_id: CartId,
        user_id: UserId,
    ) -> impl Future<Output = Result<AbsorbOutcome, RepositoryError>> + Send;

    /// Look up a product.
    fn find_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Add `quantity` of a product, incrementing an existing line. The line is
    /// capped at [`Quantity::MAX`] unless it already exceeds it.
    fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<CartItem, RepositoryError>> + Send;

    /// Set a line's quantity. Returns `false` if the item is not in the cart.
    fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove a line, deleting the cart when it was the last one.
    fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> impl Future<Output = Result<RemoveOutcome, RepositoryError>> + Send;

    /// Delete a cart and its lines. Returns `false` if it did not exist.
    fn delete_cart(
        &self,
        cart_id: CartId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// The cart with its priced lines.
    fn cart_view(
        &self,
        cart: &Cart,
    ) -> impl Future<Output = Result<CartView, RepositoryError>> + Send;

    /// Sum of line quantities.
    fn item_count(
        &self,
        cart_id: CartId,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;
}

/// Cart operations for one request context.
///
/// `user` is the signed-in user, if any; `token` holds the guest cart ID.
pub struct CartService<'a, S> {
    store: &'a S,
}

impl<'a, S: CartStore> CartService<'a, S> {
    /// Create a cart service over a store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve the request's single logical cart, merging a guest cart into
    /// the user's cart when both are present.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the lookup or the merge fails. A
    /// failed merge is rolled back and the guest token is left in place, so
    /// the next call retries it.
    #[instrument(skip(self, token), fields(user_id = ?user))]
    pub async fn resolve_cart<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
    ) -> Result<Option<Cart>, CartError> {
        let guest_id = token.guest_cart_id().await;

        match (user, guest_id) {
            (Some(user_id), None) => Ok(self.store.find_user_cart(user_id).await?),
            (Some(user_id), Some(guest_id)) => {
                let outcome = self.store.absorb_guest_cart(guest_id, user_id).await?;
                token.clear_guest_cart_id().await?;

                match &outcome {
                    AbsorbOutcome::Adopted(cart) => {
                        tracing::info!(cart_id = %cart.id, %user_id, "Guest cart adopted by user");
                    }
                    AbsorbOutcome::Merged { cart, lines } => {
                        tracing::info!(
                            cart_id = %cart.id,
                            guest_cart_id = %guest_id,
                            lines,
                            %user_id,
                            "Guest cart merged into user cart"
                        );
                    }
                    AbsorbOutcome::Discarded(_) => {
                        tracing::debug!(guest_cart_id = %guest_id, "Stale guest cart token discarded");
                    }
                }

                Ok(outcome.into_cart())
            }
            (None, Some(guest_id)) => match self.store.find_cart(guest_id).await? {
                Some(cart) if cart.is_guest() => Ok(Some(cart)),
                _ => {
                    tracing::debug!(guest_cart_id = %guest_id, "Guest cart gone, clearing token");
                    token.clear_guest_cart_id().await?;
                    Ok(None)
                }
            },
            (None, None) => Ok(None),
        }
    }

    /// The current cart with priced lines, or `None` if there is no cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if resolution or loading fails.
    pub async fn get_current_cart<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
    ) -> Result<Option<CartView>, CartError> {
        match self.resolve_cart(user, token).await? {
            Some(cart) => Ok(Some(self.store.cart_view(&cart).await?)),
            None => Ok(None),
        }
    }

    /// Add a product, creating the cart (and guest token) on first add.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for quantities outside `1..=99`,
    /// `CartError::ProductUnavailable` for unknown or inactive products.
    #[instrument(skip(self, token), fields(user_id = ?user))]
    pub async fn add_item<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        let quantity = Quantity::new(quantity)?;

        self.store
            .find_product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductUnavailable(product_id))?;

        let cart = match self.resolve_cart(user, token).await? {
            Some(cart) => cart,
            None => {
                let cart = self.store.create_cart(user).await?;
                if user.is_none() {
                    token.set_guest_cart_id(cart.id).await?;
                }
                tracing::debug!(cart_id = %cart.id, guest = cart.is_guest(), "Cart created");
                cart
            }
        };

        let item = self.store.add_item(cart.id, product_id, quantity).await?;
        tracing::debug!(cart_id = %cart.id, item_id = %item.id, quantity = item.quantity, "Item added");

        Ok(self.store.cart_view(&cart).await?)
    }

    /// Set a line's quantity; `0` removes the line.
    ///
    /// Unknown items and missing carts are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for quantities above 99.
    #[instrument(skip(self, token), fields(user_id = ?user))]
    pub async fn update_quantity<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Option<CartView>, CartError> {
        if quantity == 0 {
            return self.remove_item(user, token, item_id).await;
        }
        let quantity = Quantity::new(quantity)?;

        let Some(cart) = self.resolve_cart(user, token).await? else {
            return Ok(None);
        };

        if !self.store.set_quantity(cart.id, item_id, quantity).await? {
            tracing::debug!(cart_id = %cart.id, %item_id, "Update for item not in cart ignored");
        }

        Ok(Some(self.store.cart_view(&cart).await?))
    }

    /// Remove a line. Removing the last line deletes the cart.
    ///
    /// Idempotent: unknown items and missing carts are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store fails.
    #[instrument(skip(self, token), fields(user_id = ?user))]
    pub async fn remove_item<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
        item_id: CartItemId,
    ) -> Result<Option<CartView>, CartError> {
        let Some(cart) = self.resolve_cart(user, token).await? else {
            return Ok(None);
        };

        match self.store.remove_item(cart.id, item_id).await? {
            RemoveOutcome::CartDeleted => {
                if cart.is_guest() {
                    token.clear_guest_cart_id().await?;
                }
                tracing::debug!(cart_id = %cart.id, "Last item removed, cart deleted");
                Ok(None)
            }
            RemoveOutcome::Removed | RemoveOutcome::NotFound => {
                Ok(Some(self.store.cart_view(&cart).await?))
            }
        }
    }

    /// Delete the current cart entirely. No-op without a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store fails.
    #[instrument(skip(self, token), fields(user_id = ?user))]
    pub async fn clear_cart<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
    ) -> Result<(), CartError> {
        if let Some(cart) = self.resolve_cart(user, token).await? {
            self.store.delete_cart(cart.id).await?;
            if cart.is_guest() {
                token.clear_guest_cart_id().await?;
            }
            tracing::debug!(cart_id = %cart.id, "Cart cleared");
        }
        Ok(())
    }

    /// Total units in the current cart (0 without a cart).
    ///
    /// # Errors
    ///
    /// Returns `CartError` if resolution or counting fails.
    pub async fn get_item_count<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
    ) -> Result<i64, CartError> {
        match self.resolve_cart(user, token).await? {
            Some(cart) => Ok(self.store.item_count(cart.id).await?),
            None => Ok(0),
        }
    }
}
