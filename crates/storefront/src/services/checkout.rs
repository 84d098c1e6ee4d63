//! Checkout: turn the current cart into an order.
//!
//! Placing an order resolves the cart (merging any guest cart first), checks
//! it, draws an order number, and hands off to [`OrderStore::create_from_cart`]
//! which writes the order and deletes the cart in one transaction. An order
//! number drawn for a checkout that then fails is not reused.

use std::future::Future;

use thiserror::Error;
use tracing::instrument;

use souq_core::{CartId, OrderNumber, OrderNumberFormat, UserId};

use super::cart::{CartError, CartService, CartStore, CartToken};
use super::order_number::{OrderNumberSequencer, OrderNumberStore};
use crate::db::RepositoryError;
use crate::models::{Order, OrderDetails, OrderSummary};

/// Order persistence.
pub trait OrderStore: Send + Sync {
    /// Snapshot the cart into a new order and delete the cart, atomically.
    ///
    /// Fails with `NotFound` if the cart is gone or empty, `Conflict` if the
    /// order number is taken or a product was deactivated.
    fn create_from_cart(
        &self,
        cart_id: CartId,
        user_id: Option<UserId>,
        order_number: &OrderNumber,
        details: &OrderDetails,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// The user's orders, newest first.
    fn list_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<OrderSummary>, RepositoryError>> + Send;

    /// One of the user's orders by number.
    fn get_for_user(
        &self,
        user_id: UserId,
        order_number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No cart, or a cart without lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Some lines refer to products that are no longer sold.
    #[error("unavailable products in cart: {}", .0.join(", "))]
    UnavailableItems(Vec<String>),

    /// Delivery details failed validation; the message is shopper-facing.
    #[error("invalid details: {0}")]
    InvalidDetails(String),

    /// Order number already used, or the cart changed underneath us.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Cart resolution failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CheckoutError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::EmptyCart,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// Checkout over cart, counter and order stores.
pub struct CheckoutService<'a, C, N, O> {
    carts: &'a C,
    counter: &'a N,
    orders: &'a O,
    format: &'a OrderNumberFormat,
}

impl<'a, C, N, O> CheckoutService<'a, C, N, O>
where
    C: CartStore,
    N: OrderNumberStore,
    O: OrderStore,
{
    /// Create a checkout service.
    #[must_use]
    pub const fn new(
        carts: &'a C,
        counter: &'a N,
        orders: &'a O,
        format: &'a OrderNumberFormat,
    ) -> Self {
        Self {
            carts,
            counter,
            orders,
            format,
        }
    }

    /// Place an order for the current cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` without a non-empty cart,
    /// `UnavailableItems` if a product was deactivated, `InvalidDetails` for
    /// bad delivery details, and `Conflict` on an order number collision.
    #[instrument(skip(self, token, details), fields(user_id = ?user))]
    pub async fn place_order<T: CartToken>(
        &self,
        user: Option<UserId>,
        token: &T,
        details: OrderDetails,
    ) -> Result<Order, CheckoutError> {
        let details = details.normalized().map_err(CheckoutError::InvalidDetails)?;

        let view = CartService::new(self.carts)
            .get_current_cart(user, token)
            .await?
            .filter(|v| !v.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        let unavailable: Vec<String> = view.unavailable_lines().map(|l| l.name.clone()).collect();
        if !unavailable.is_empty() {
            return Err(CheckoutError::UnavailableItems(unavailable));
        }

        let order_number = OrderNumberSequencer::new(self.counter, self.format)
            .generate_order_number()
            .await;

        let order = self
            .orders
            .create_from_cart(view.cart.id, user, &order_number, &details)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, %order_number, "Order creation failed");
            })?;

        if view.cart.is_guest() {
            token.clear_guest_cart_id().await.map_err(CheckoutError::Cart)?;
        }

        tracing::info!(
            order_id = %order.id,
            %order_number,
            items = order.items.len(),
            subtotal = %order.subtotal,
            "Order placed"
        );

        Ok(order)
    }

    /// The user's order history.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the query fails.
    pub async fn list_orders(&self, user: UserId) -> Result<Vec<OrderSummary>, CheckoutError> {
        Ok(self.orders.list_for_user(user).await?)
    }

    /// One of the user's orders; other users' orders are not visible.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the query fails.
    pub async fn get_order(
        &self,
        user: UserId,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, CheckoutError> {
        Ok(self.orders.get_for_user(user, order_number).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use souq_core::{OrderId, OrderStatus, Price, ProductId};

    use super::*;
    use crate::models::OrderItem;
    use crate::services::cart::tests::{MemoryCartStore, MemoryToken};
    use crate::services::order_number::tests::MemoryCounterStore;

    struct MemoryOrderStore<'a> {
        carts: &'a MemoryCartStore,
        orders: Mutex<Vec<Order>>,
        reject_number: AtomicBool,
    }

    impl<'a> MemoryOrderStore<'a> {
        fn new(carts: &'a MemoryCartStore) -> Self {
            Self {
                carts,
                orders: Mutex::new(Vec::new()),
                reject_number: AtomicBool::new(false),
            }
        }
    }

    impl OrderStore for MemoryOrderStore<'_> {
        async fn create_from_cart(
            &self,
            cart_id: CartId,
            user_id: Option<UserId>,
            order_number: &OrderNumber,
            details: &OrderDetails,
        ) -> Result<Order, RepositoryError> {
            if self.reject_number.load(Ordering::SeqCst) {
                return Err(RepositoryError::Conflict("order number already exists".to_owned()));
            }
            let cart = self
                .carts
                .find_cart(cart_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let view = self.carts.cart_view(&cart).await?;
            let items: Vec<OrderItem> = view
                .lines
                .iter()
                .map(|l| OrderItem {
                    product_id: Some(l.product_id),
                    product_name: l.name.clone(),
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect();
            self.carts.delete_cart(cart_id).await?;

            let mut orders = self.orders.lock().unwrap();
            let order = Order {
                id: OrderId::new(i32::try_from(orders.len()).unwrap() + 1),
                order_number: order_number.clone(),
                user_id,
                customer_name: details.customer_name.clone(),
                phone: details.phone.clone(),
                city: details.city.clone(),
                address: details.address.clone(),
                notes: details.notes.clone(),
                status: OrderStatus::Pending,
                subtotal: view.subtotal(),
                created_at: Utc::now(),
                items,
            };
            orders.push(order.clone());
            Ok(order)
        }

        async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
            let orders = self.orders.lock().unwrap();
            Ok(orders
                .iter()
                .rev()
                .filter(|o| o.user_id == Some(user_id))
                .map(|o| OrderSummary {
                    order_number: o.order_number.clone(),
                    status: o.status,
                    subtotal: o.subtotal,
                    item_count: o.items.iter().map(|i| i64::from(i.quantity)).sum(),
                    created_at: o.created_at,
                })
                .collect())
        }

        async fn get_for_user(
            &self,
            user_id: UserId,
            order_number: &OrderNumber,
        ) -> Result<Option<Order>, RepositoryError> {
            let orders = self.orders.lock().unwrap();
            Ok(orders
                .iter()
                .find(|o| o.user_id == Some(user_id) && &o.order_number == order_number)
                .cloned())
        }
    }

    fn details() -> OrderDetails {
        OrderDetails {
            customer_name: "نورة".to_owned(),
            phone: "0501234567".to_owned(),
            city: "جدة".to_owned(),
            address: "حي الروضة".to_owned(),
            notes: None,
        }
    }

    const USER: UserId = UserId::new(3);

    #[tokio::test]
    async fn test_guest_checkout_places_order_and_removes_cart() {
        let carts = MemoryCartStore::with_products(&[1, 2]);
        let counter = MemoryCounterStore::default();
        let orders = MemoryOrderStore::new(&carts);
        let format = OrderNumberFormat::default();
        let token = MemoryToken::default();

        CartService::new(&carts)
            .add_item(None, &token, ProductId::new(1), 2)
            .await
            .unwrap();
        CartService::new(&carts)
            .add_item(None, &token, ProductId::new(2), 1)
            .await
            .unwrap();

        let checkout = CheckoutService::new(&carts, &counter, &orders, &format);
        let order = checkout.place_order(None, &token, details()).await.unwrap();

        assert_eq!(order.order_number.as_str(), "ORD-000001");
        assert_eq!(order.items.len(), 2);
        // 2 x 10 + 1 x 20
        assert_eq!(order.subtotal, Price::new(Decimal::from(40), order.subtotal.currency_code));
        assert!(token.guest_cart_id().await.is_none());
        assert!(
            CartService::new(&carts)
                .get_current_cart(None, &token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_without_burning_a_number() {
        let carts = MemoryCartStore::with_products(&[1]);
        let counter = MemoryCounterStore::default();
        let orders = MemoryOrderStore::new(&carts);
        let format = OrderNumberFormat::default();
        let token = MemoryToken::default();
        let checkout = CheckoutService::new(&carts, &counter, &orders, &format);

        let err = checkout.place_order(None, &token, details()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(counter.current(ORDER_KEY).await.unwrap(), None);
    }

    const ORDER_KEY: &str = crate::services::order_number::ORDER_COUNTER_KEY;

    #[tokio::test]
    async fn test_invalid_details_are_rejected() {
        let carts = MemoryCartStore::with_products(&[1]);
        let counter = MemoryCounterStore::default();
        let orders = MemoryOrderStore::new(&carts);
        let format = OrderNumberFormat::default();
        let token = MemoryToken::default();
        CartService::new(&carts)
            .add_item(None, &token, ProductId::new(1), 1)
            .await
            .unwrap();

        let mut bad = details();
        bad.phone = "abc".to_owned();
        let err = CheckoutService::new(&carts, &counter, &orders, &format)
            .place_order(None, &token, bad)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidDetails(_)));
        assert!(token.guest_cart_id().await.is_some());
    }

    #[tokio::test]
    async fn test_order_number_conflict_keeps_cart() {
        let carts = MemoryCartStore::with_products(&[1]);
        let counter = MemoryCounterStore::default();
        let orders = MemoryOrderStore::new(&carts);
        orders.reject_number.store(true, Ordering::SeqCst);
        let format = OrderNumberFormat::default();
        let token = MemoryToken::default();
        CartService::new(&carts)
            .add_item(None, &token, ProductId::new(1), 1)
            .await
            .unwrap();

        let err = CheckoutService::new(&carts, &counter, &orders, &format)
            .place_order(None, &token, details())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Conflict(_)));
        assert!(token.guest_cart_id().await.is_some());
        assert_eq!(
            CartService::new(&carts)
                .get_item_count(None, &token)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_user_checkout_merges_guest_cart_first() {
        let carts = MemoryCartStore::with_products(&[1]);
        let counter = MemoryCounterStore::default();
        let orders = MemoryOrderStore::new(&carts);
        let format = OrderNumberFormat::default();
        let token = MemoryToken::default();
        let cart_service = CartService::new(&carts);

        cart_service.add_item(None, &token, ProductId::new(1), 2).await.unwrap();
        cart_service.add_item(Some(USER), &MemoryToken::default(), ProductId::new(1), 1).await.unwrap();

        let checkout = CheckoutService::new(&carts, &counter, &orders, &format);
        let order = checkout.place_order(Some(USER), &token, details()).await.unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.user_id, Some(USER));

        let history = checkout.list_orders(USER).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].item_count, 3);

        let found = checkout.get_order(USER, &order.order_number).await.unwrap();
        assert!(found.is_some());
        let hidden = checkout
            .get_order(UserId::new(99), &order.order_number)
            .await
            .unwrap();
        assert!(hidden.is_none());
    }

    #[tokio::test]
    async fn test_sequential_checkouts_get_increasing_numbers() {
        let carts = MemoryCartStore::with_products(&[1]);
        let counter = MemoryCounterStore::default();
        let orders = MemoryOrderStore::new(&carts);
        let format = OrderNumberFormat::default();
        let checkout = CheckoutService::new(&carts, &counter, &orders, &format);

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let token = MemoryToken::default();
            CartService::new(&carts)
                .add_item(None, &token, ProductId::new(1), 1)
                .await
                .unwrap();
            numbers.push(checkout.place_order(None, &token, details()).await.unwrap().order_number);
        }

        let numbers: Vec<&str> = numbers.iter().map(OrderNumber::as_str).collect();
        assert_eq!(numbers, ["ORD-000001", "ORD-000002", "ORD-000003"]);
    }
}
