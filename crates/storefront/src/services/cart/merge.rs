//! Guest-to-user cart merge planning.
//!
//! The plan is computed from the two carts' lines and then applied by the
//! store inside one transaction. Keeping the arithmetic here, away from SQL,
//! lets the summing rules be tested without a database.

use std::collections::HashMap;

use souq_core::{CartItemId, ProductId};

use crate::models::CartItem;

/// Writes needed to fold a guest cart into a user cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Existing user lines whose quantity becomes the given sum.
    pub updates: Vec<(CartItemId, i32)>,
    /// Products only the guest cart had, copied with their quantity.
    pub inserts: Vec<(ProductId, i32)>,
}

impl MergePlan {
    /// Number of guest lines the plan accounts for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len() + self.inserts.len()
    }

    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plan the merge of `guest_items` into the cart holding `user_items`.
///
/// Overlapping products get the sum of both quantities; products only in the
/// guest cart are copied. Quantities are not capped, so nothing the shopper
/// picked is lost. Output follows guest-line order.
#[must_use]
pub fn plan_merge(user_items: &[CartItem], guest_items: &[CartItem]) -> MergePlan {
    let existing: HashMap<ProductId, &CartItem> =
        user_items.iter().map(|item| (item.product_id, item)).collect();

    let mut plan = MergePlan::default();
    for guest in guest_items {
        match existing.get(&guest.product_id) {
            Some(user_item) => plan.updates.push((
                user_item.id,
                user_item.quantity.saturating_add(guest.quantity),
            )),
            None => plan.inserts.push((guest.product_id, guest.quantity)),
        }
    }
    plan
}
