//! Session-related types.
//!
//! Types stored in the server-side session. The session cookie only carries
//! the session ID, so values stored here are opaque to the client.

use serde::{Deserialize, Serialize};

use souq_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous (guest) cart ID.
    pub const GUEST_CART_ID: &str = "guest_cart_id";
}
