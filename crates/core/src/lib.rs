//! Souq Core - Shared types library.
//!
//! This crate provides common types used across all Souq components:
//! - `storefront` - Public-facing Arabic storefront (cart, checkout, accounts)
//! - `cli` - Command-line tools for migrations, seeding, and order counter administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database access,
//! no clocks. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, quantities, prices, statuses,
//!   and order numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
