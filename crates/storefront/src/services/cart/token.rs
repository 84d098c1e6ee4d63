//! Guest cart token storage.
//!
//! A guest cart is reachable only through the ID kept in the shopper's
//! server-side session; the cookie itself carries the session ID.

use std::future::Future;

use tower_sessions::Session;

use souq_core::CartId;

use super::CartError;
use crate::models::session_keys;

/// Client-held handle to the shopper's guest cart.
pub trait CartToken: Send + Sync {
    /// The guest cart ID, if one has been issued.
    fn guest_cart_id(&self) -> impl Future<Output = Option<CartId>> + Send;

    /// Remember a newly created guest cart.
    fn set_guest_cart_id(&self, id: CartId) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Forget the guest cart (after a merge commits, or when it is gone).
    fn clear_guest_cart_id(&self) -> impl Future<Output = Result<(), CartError>> + Send;
}

impl CartToken for Session {
    async fn guest_cart_id(&self) -> Option<CartId> {
        match self.get::<CartId>(session_keys::GUEST_CART_ID).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable guest cart token, ignoring");
                None
            }
        }
    }

    async fn set_guest_cart_id(&self, id: CartId) -> Result<(), CartError> {
        self.insert(session_keys::GUEST_CART_ID, id).await?;
        Ok(())
    }

    async fn clear_guest_cart_id(&self) -> Result<(), CartError> {
        self.remove::<CartId>(session_keys::GUEST_CART_ID).await?;
        Ok(())
    }
}
