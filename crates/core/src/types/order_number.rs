//! Human-readable order numbers.
//!
//! An order number is `prefix + separator + sequence`, where the sequence is
//! zero-padded to a fixed width (`ORD-000123`). When the database counter is
//! unavailable the sequence is replaced by epoch milliseconds
//! (`ORD-1760745600123`), which keeps orders flowing at the cost of strict
//! sequentiality for that one order.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building an [`OrderNumberFormat`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberFormatError {
    /// Prefix must be non-empty ASCII alphanumerics.
    #[error("order number prefix must be 1-{max} ASCII letters or digits")]
    InvalidPrefix {
        /// Maximum prefix length.
        max: usize,
    },
    /// Separator must be short and printable.
    #[error("order number separator must be at most {max} printable ASCII characters")]
    InvalidSeparator {
        /// Maximum separator length.
        max: usize,
    },
    /// Padding width out of range.
    #[error("order number padding must be between 1 and {max}")]
    InvalidPadding {
        /// Maximum padding width.
        max: usize,
    },
}

/// Formatting options for order numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNumberFormat {
    prefix: String,
    separator: String,
    padding: usize,
}

impl OrderNumberFormat {
    /// Default prefix.
    pub const DEFAULT_PREFIX: &'static str = "ORD";
    /// Default separator.
    pub const DEFAULT_SEPARATOR: &'static str = "-";
    /// Default zero-padding width.
    pub const DEFAULT_PADDING: usize = 6;

    const MAX_PREFIX_LEN: usize = 10;
    const MAX_SEPARATOR_LEN: usize = 3;
    /// `i64::MAX` has 19 digits; wider padding is pointless.
    pub const MAX_PADDING: usize = 18;

    /// Build a validated format.
    ///
    /// # Errors
    ///
    /// Returns `OrderNumberFormatError` if the prefix is empty, too long or not
    /// alphanumeric, the separator is too long or contains non-printable
    /// characters, or the padding is outside `1..=18`.
    pub fn new(
        prefix: impl Into<String>,
        separator: impl Into<String>,
        padding: usize,
    ) -> Result<Self, OrderNumberFormatError> {
        let prefix = prefix.into();
        let separator = separator.into();

        if prefix.is_empty()
            || prefix.len() > Self::MAX_PREFIX_LEN
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(OrderNumberFormatError::InvalidPrefix {
                max: Self::MAX_PREFIX_LEN,
            });
        }
        if separator.len() > Self::MAX_SEPARATOR_LEN
            || !separator.chars().all(|c| c.is_ascii_graphic())
        {
            return Err(OrderNumberFormatError::InvalidSeparator {
                max: Self::MAX_SEPARATOR_LEN,
            });
        }
        if padding == 0 || padding > Self::MAX_PADDING {
            return Err(OrderNumberFormatError::InvalidPadding {
                max: Self::MAX_PADDING,
            });
        }

        Ok(Self {
            prefix,
            separator,
            padding,
        })
    }

    /// The prefix (e.g. `ORD`).
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The separator (e.g. `-`).
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The zero-padding width.
    #[must_use]
    pub const fn padding(&self) -> usize {
        self.padding
    }

    /// Format a counter value. Values wider than the padding are kept whole.
    ///
    /// ```
    /// use souq_core::OrderNumberFormat;
    ///
    /// let format = OrderNumberFormat::default();
    /// assert_eq!(format.format(6).as_str(), "ORD-000006");
    /// assert_eq!(format.format(1_234_567).as_str(), "ORD-1234567");
    /// ```
    #[must_use]
    pub fn format(&self, sequence: i64) -> OrderNumber {
        OrderNumber(format!(
            "{}{}{:0>width$}",
            self.prefix,
            self.separator,
            sequence,
            width = self.padding
        ))
    }

    /// Fallback number built from epoch milliseconds, used when the counter
    /// cannot be incremented.
    #[must_use]
    pub fn fallback(&self, epoch_millis: i64) -> OrderNumber {
        OrderNumber(format!("{}{}{}", self.prefix, self.separator, epoch_millis))
    }
}

impl Default for OrderNumberFormat {
    fn default() -> Self {
        Self {
            prefix: Self::DEFAULT_PREFIX.to_owned(),
            separator: Self::DEFAULT_SEPARATOR.to_owned(),
            padding: Self::DEFAULT_PADDING,
        }
    }
}

/// A generated order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Maximum accepted length when parsing user input.
    pub const MAX_LENGTH: usize = 40;

    /// Wrap a stored or user-supplied order number.
    ///
    /// Returns `None` for empty, over-long or non-printable input, so lookups
    /// never reach the database with garbage.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        (!trimmed.is_empty()
            && trimmed.len() <= Self::MAX_LENGTH
            && trimmed.chars().all(|c| c.is_ascii_graphic()))
        .then(|| Self(trimmed.to_owned()))
    }

    /// The order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
