//! `PostgreSQL` cart store.
//!
//! Multi-row changes (merge, last-item removal) run in a transaction. The
//! merge locks the guest cart row first and the user cart row second, so two
//! concurrent logins presenting the same guest cart serialize and the second
//! finds nothing left to merge.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use souq_core::{CartId, CartItemId, CurrencyCode, Price, ProductId, Quantity, UserId};

use super::RepositoryError;
use super::products::ProductRepository;
use crate::models::{Cart, CartItem, CartLine, CartView, Product};
use crate::services::cart::{AbsorbOutcome, CartStore, RemoveOutcome, plan_merge};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i32,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: row.quantity,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: CartItemId,
    product_id: ProductId,
    slug: String,
    name: String,
    price: Decimal,
    quantity: i32,
    is_active: bool,
}

/// Cart persistence backed by the `storefront.cart` tables.
pub struct PgCartStore<'a> {
    pool: &'a PgPool,
    currency: CurrencyCode,
}

impl<'a> PgCartStore<'a> {
    /// Create a cart store pricing lines in `currency`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }

    /// Delete guest carts created before `cutoff`. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_stale_guest_carts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart
            WHERE user_id IS NULL AND created_at < $1
            ",
        )
        .bind(cutoff)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

async fn lock_cart(
    conn: &mut PgConnection,
    id: CartId,
) -> Result<Option<CartRow>, RepositoryError> {
    let row = sqlx::query_as(
        r"
        SELECT id, user_id, created_at
        FROM storefront.cart
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

async fn lock_user_cart(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<CartRow>, RepositoryError> {
    let row = sqlx::query_as(
        r"
        SELECT id, user_id, created_at
        FROM storefront.cart
        WHERE user_id = $1
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

async fn items_of(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        r"
        SELECT id, cart_id, product_id, quantity
        FROM storefront.cart_item
        WHERE cart_id = $1
        ORDER BY id
        ",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(CartItem::from).collect())
}

async fn delete_cart_row(conn: &mut PgConnection, id: CartId) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

impl CartStore for PgCartStore<'_> {
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(
            r"
            SELECT id, user_id, created_at
            FROM storefront.cart
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn find_user_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(
            r"
            SELECT id, user_id, created_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn create_cart(&self, user_id: Option<UserId>) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row: CartRow = sqlx::query_as(
            r"
            INSERT INTO storefront.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
            RETURNING id, user_id, created_at
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self), fields(guest_cart_id = %guest_id, user_id = %user_id))]
    async fn absorb_guest_cart(
        &self,
        guest_id: CartId,
        user_id: UserId,
    ) -> Result<AbsorbOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let guest = match lock_cart(&mut tx, guest_id).await? {
            Some(row) if row.user_id.is_none() => row,
            _ => {
                let user_cart = lock_user_cart(&mut tx, user_id).await?;
                tx.commit().await?;
                return Ok(AbsorbOutcome::Discarded(user_cart.map(Cart::from)));
            }
        };

        let guest_items = items_of(&mut tx, guest.id).await?;
        let user_cart = lock_user_cart(&mut tx, user_id).await?;

        if guest_items.is_empty() {
            delete_cart_row(&mut tx, guest.id).await?;
            tx.commit().await?;
            return Ok(AbsorbOutcome::Discarded(user_cart.map(Cart::from)));
        }

        let Some(user_cart) = user_cart else {
            let adopted: CartRow = sqlx::query_as(
                r"
                UPDATE storefront.cart
                SET user_id = $2, updated_at = now()
                WHERE id = $1
                RETURNING id, user_id, created_at
                ",
            )
            .bind(guest.id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(AbsorbOutcome::Adopted(adopted.into()));
        };

        let user_items = items_of(&mut tx, user_cart.id).await?;
        let plan = plan_merge(&user_items, &guest_items);

        for (item_id, quantity) in &plan.updates {
            sqlx::query(
                r"
                UPDATE storefront.cart_item
                SET quantity = $2, updated_at = now()
                WHERE id = $1
                ",
            )
            .bind(item_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        for (product_id, quantity) in &plan.inserts {
            sqlx::query(
                r"
                INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(user_cart.id)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        delete_cart_row(&mut tx, guest.id).await?;

        sqlx::query("UPDATE storefront.cart SET updated_at = now() WHERE id = $1")
            .bind(user_cart.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(AbsorbOutcome::Merged {
            cart: user_cart.into(),
            lines: plan.len(),
        })
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(self.pool, self.currency)
            .get_by_id(id)
            .await
    }

    async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        // A line already above the cap (from a merge) is left as is.
        let row: CartItemRow = sqlx::query_as(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE
            SET quantity = LEAST(
                    storefront.cart_item.quantity + EXCLUDED.quantity,
                    GREATEST(storefront.cart_item.quantity, $4)
                ),
                updated_at = now()
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .bind(i32::from(Quantity::MAX))
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_item
            SET quantity = $3, updated_at = now()
            WHERE id = $1 AND cart_id = $2
            ",
        )
        .bind(item_id)
        .bind(cart_id)
        .bind(quantity.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<RemoveOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if lock_cart(&mut tx, cart_id).await?.is_none() {
            tx.commit().await?;
            return Ok(RemoveOutcome::NotFound);
        }

        let removed = sqlx::query("DELETE FROM storefront.cart_item WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            tx.commit().await?;
            return Ok(RemoveOutcome::NotFound);
        }

        let (remaining,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM storefront.cart_item WHERE cart_id = $1")
                .bind(cart_id)
                .fetch_one(&mut *tx)
                .await?;

        let outcome = if remaining == 0 {
            delete_cart_row(&mut tx, cart_id).await?;
            RemoveOutcome::CartDeleted
        } else {
            RemoveOutcome::Removed
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        delete_cart_row(&mut conn, cart_id).await
    }

    async fn cart_view(&self, cart: &Cart) -> Result<CartView, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT ci.id AS item_id, ci.product_id, p.slug, p.name, p.price,
                   ci.quantity, p.is_active
            FROM storefront.cart_item ci
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart.id)
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|r| CartLine {
                item_id: r.item_id,
                product_id: r.product_id,
                slug: r.slug,
                name: r.name,
                unit_price: Price::new(r.price, self.currency),
                quantity: r.quantity,
                available: r.is_active,
            })
            .collect();

        Ok(CartView {
            cart: cart.clone(),
            lines,
            currency: self.currency,
        })
    }

    async fn item_count(&self, cart_id: CartId) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM storefront.cart_item
            WHERE cart_id = $1
            ",
        )
        .bind(cart_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
