//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use souq_core::{CartId, CartItemId, CurrencyCode, Price, ProductId, UserId};

/// A shopping cart.
///
/// `user_id` is `None` for guest carts, which are reachable only through the
/// cart ID stored in the shopper's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Whether this cart is a guest cart (no owning user).
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

/// A raw cart line: one product and its quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A cart line joined with the product data needed for display and checkout.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub unit_price: Price,
    pub quantity: i32,
    /// `false` once the product is deactivated; checkout refuses such lines.
    pub available: bool,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// A cart with its priced lines.
#[derive(Debug, Clone)]
pub struct CartView {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    pub currency: CurrencyCode,
}

impl CartView {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        let amount = self
            .lines
            .iter()
            .map(|l| l.line_total().amount)
            .sum::<Decimal>();
        Price::new(amount, self.currency)
    }

    /// Lines whose product can no longer be bought.
    pub fn unavailable_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| !l.available)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, price_halalas: i64, quantity: i32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(id),
            product_id: ProductId::new(id),
            slug: format!("p-{id}"),
            name: format!("منتج {id}"),
            unit_price: Price::new(Decimal::new(price_halalas, 2), CurrencyCode::SAR),
            quantity,
            available: true,
        }
    }

    #[test]
    fn test_totals() {
        let view = CartView {
            cart: Cart {
                id: CartId::new(1),
                user_id: None,
                created_at: Utc::now(),
            },
            lines: vec![line(1, 1000, 2), line(2, 250, 4)],
            currency: CurrencyCode::SAR,
        };

        assert_eq!(view.item_count(), 6);
        assert_eq!(view.subtotal().amount, Decimal::new(3000, 2));
        assert!(view.cart.is_guest());
    }

    #[test]
    fn test_owned_cart_is_not_guest() {
        let cart = Cart {
            id: CartId::new(2),
            user_id: Some(UserId::new(7)),
            created_at: Utc::now(),
        };
        assert!(!cart.is_guest());
    }
}
