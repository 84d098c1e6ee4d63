//! Order repository.
//!
//! Orders are created from a cart in one transaction: the cart row is locked,
//! its lines are snapshotted into `order_item` with current prices, and the
//! cart is deleted. Any failure leaves the cart untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use souq_core::{
    CartId, CurrencyCode, OrderId, OrderNumber, OrderStatus, Price, ProductId, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderDetails, OrderItem, OrderSummary};
use crate::services::checkout::OrderStore;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: OrderNumber,
    user_id: Option<UserId>,
    customer_name: String,
    phone: String,
    city: String,
    address: String,
    notes: Option<String>,
    status: OrderStatus,
    subtotal: Decimal,
    currency_code: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let currency = parse_currency(&self.currency_code)?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer_name: self.customer_name,
            phone: self.phone,
            city: self.city,
            address: self.address,
            notes: self.notes,
            status: self.status,
            subtotal: Price::new(self.subtotal, currency),
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: Option<ProductId>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    order_number: OrderNumber,
    status: OrderStatus,
    subtotal: Decimal,
    currency_code: String,
    item_count: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    product_id: ProductId,
    name: String,
    price: Decimal,
    quantity: i32,
    is_active: bool,
}

fn parse_currency(code: &str) -> Result<CurrencyCode, RepositoryError> {
    code.parse()
        .map_err(|_| RepositoryError::DataCorruption(format!("unknown currency code: {code}")))
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
    currency: CurrencyCode,
}

impl<'a> OrderRepository<'a> {
    /// Create an order repository; new orders are recorded in `currency`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }

    async fn items_for(
        &self,
        order_id: OrderId,
        currency: CurrencyCode,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT product_id, product_name, unit_price, quantity
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrderItem {
                product_id: r.product_id,
                product_name: r.product_name,
                unit_price: Price::new(r.unit_price, currency),
                quantity: r.quantity,
            })
            .collect())
    }
}

impl OrderStore for OrderRepository<'_> {
    #[instrument(skip(self, details), fields(cart_id = %cart_id, order_number = %order_number))]
    async fn create_from_cart(
        &self,
        cart_id: CartId,
        user_id: Option<UserId>,
        order_number: &OrderNumber,
        details: &OrderDetails,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(CartId,)> =
            sqlx::query_as("SELECT id FROM storefront.cart WHERE id = $1 FOR UPDATE")
                .bind(cart_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let lines: Vec<SnapshotRow> = sqlx::query_as(
            r"
            SELECT ci.product_id, p.name, p.price, ci.quantity, p.is_active
            FROM storefront.cart_item ci
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            FOR SHARE OF p
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(RepositoryError::NotFound);
        }
        if let Some(line) = lines.iter().find(|l| !l.is_active) {
            return Err(RepositoryError::Conflict(format!(
                "product {} is no longer available",
                line.product_id
            )));
        }

        let subtotal: Decimal = lines
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();

        let row: OrderRow = sqlx::query_as(
            r"
            INSERT INTO storefront.order
                (order_number, user_id, customer_name, phone, city, address, notes,
                 subtotal, currency_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, order_number, user_id, customer_name, phone, city, address,
                      notes, status, subtotal, currency_code, created_at
            ",
        )
        .bind(order_number)
        .bind(user_id)
        .bind(&details.customer_name)
        .bind(&details.phone)
        .bind(&details.city)
        .bind(&details.address)
        .bind(details.notes.as_deref())
        .bind(subtotal)
        .bind(self.currency.code())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "order number"))?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            sqlx::query(
                r"
                INSERT INTO storefront.order_item
                    (order_id, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.price)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            items.push(OrderItem {
                product_id: Some(line.product_id),
                product_name: line.name,
                unit_price: Price::new(line.price, self.currency),
                quantity: line.quantity,
            });
        }

        sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.into_order(items)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r"
            SELECT o.order_number, o.status, o.subtotal, o.currency_code, o.created_at,
                   COALESCE(SUM(oi.quantity), 0)::BIGINT AS item_count
            FROM storefront.order o
            LEFT JOIN storefront.order_item oi ON oi.order_id = o.id
            WHERE o.user_id = $1
            GROUP BY o.id
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(OrderSummary {
                    subtotal: Price::new(r.subtotal, parse_currency(&r.currency_code)?),
                    order_number: r.order_number,
                    status: r.status,
                    item_count: r.item_count,
                    created_at: r.created_at,
                })
            })
            .collect()
    }

    async fn get_for_user(
        &self,
        user_id: UserId,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, order_number, user_id, customer_name, phone, city, address,
                   notes, status, subtotal, currency_code, created_at
            FROM storefront.order
            WHERE order_number = $1 AND user_id = $2
            ",
        )
        .bind(order_number)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let currency = parse_currency(&row.currency_code)?;
                let items = self.items_for(row.id, currency).await?;
                row.into_order(items).map(Some)
            }
            None => Ok(None),
        }
    }
}
