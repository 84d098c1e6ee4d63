//! Core types for Souq.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod price;
pub mod quantity;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::{OrderNumber, OrderNumberFormat, OrderNumberFormatError};
pub use price::{CurrencyCode, Price};
pub use quantity::{Quantity, QuantityError};
pub use status::OrderStatus;
