//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `cart` - Cart resolution (guest/user merge) and cart operations
//! - `checkout` - Order placement and order history
//! - `order_number` - Sequential human-readable order numbers

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod order_number;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService, CartStore, CartToken};
pub use checkout::{CheckoutError, CheckoutService, OrderStore};
pub use order_number::{ORDER_COUNTER_KEY, OrderNumberSequencer, OrderNumberStore};
