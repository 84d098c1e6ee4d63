//! Domain models for storefront.
//!
//! These types represent validated domain objects, separate from the row
//! structs the repositories decode.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, CartView};
pub use order::{Order, OrderDetails, OrderItem, OrderSummary};
pub use product::Product;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
