//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (riyals, not halalas).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display, e.g. `"149.50 ر.س"`.
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{:.*} {}",
            self.currency_code.minor_units(),
            self.amount,
            self.currency_code.symbol()
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Saudi riyal.
    #[default]
    SAR,
    /// UAE dirham.
    AED,
    /// Egyptian pound.
    EGP,
    /// Kuwaiti dinar.
    KWD,
    /// US dollar.
    USD,
}

impl CurrencyCode {
    /// Arabic display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::SAR => "ر.س",
            Self::AED => "د.إ",
            Self::EGP => "ج.م",
            Self::KWD => "د.ك",
            Self::USD => "$",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SAR => "SAR",
            Self::AED => "AED",
            Self::EGP => "EGP",
            Self::KWD => "KWD",
            Self::USD => "USD",
        }
    }

    /// Number of decimal places in the minor unit.
    #[must_use]
    pub const fn minor_units(&self) -> usize {
        match self {
            Self::KWD => 3,
            _ => 2,
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAR" => Ok(Self::SAR),
            "AED" => Ok(Self::AED),
            "EGP" => Ok(Self::EGP),
            "KWD" => Ok(Self::KWD),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times() {
        let unit = Price::new(Decimal::new(1250, 2), CurrencyCode::SAR);
        assert_eq!(unit.times(3).amount, Decimal::new(3750, 2));
    }

    #[test]
    fn test_display_uses_arabic_symbol() {
        let price = Price::new(Decimal::new(14950, 2), CurrencyCode::SAR);
        assert_eq!(price.display(), "149.50 ر.س");
    }

    #[test]
    fn test_display_pads_minor_units() {
        let price = Price::new(Decimal::from(150), CurrencyCode::KWD);
        assert_eq!(price.display(), "150.000 د.ك");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("aed".parse::<CurrencyCode>().unwrap(), CurrencyCode::AED);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
