//! Cart line quantity bounded to what a shopper may request.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero is not a quantity; callers that mean "remove" must say so.
    #[error("quantity must be at least {min}")]
    TooSmall {
        /// Smallest accepted quantity.
        min: u8,
    },
    /// Above the per-line maximum.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Largest accepted quantity.
        max: u8,
    },
}

/// A requested line quantity in `1..=99`.
///
/// The bound applies to what a shopper asks for on add/update. Stored line
/// quantities are plain integers: merging a guest cart into a user cart sums
/// quantities without capping them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u8);

impl Quantity {
    /// Smallest accepted quantity.
    pub const MIN: u8 = 1;
    /// Largest accepted quantity per cart line.
    pub const MAX: u8 = 99;
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Validate a requested quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if `value` is outside `1..=99`.
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value < u32::from(Self::MIN) {
            return Err(QuantityError::TooSmall { min: Self::MIN });
        }
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(QuantityError::TooLarge { max: Self::MAX })
    }

    /// The quantity as an `i32`, ready to bind to an `INT` column.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        i32::from(self.0)
    }

    /// The quantity as a `u32`.
    #[must_use]
    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
