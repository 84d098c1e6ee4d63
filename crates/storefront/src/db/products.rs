//! Product catalog queries.

use rust_decimal::Decimal;
use sqlx::PgPool;

use souq_core::{CurrencyCode, Price, ProductId};

use super::RepositoryError;
use crate::models::Product;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    price: Decimal,
    is_active: bool,
}

impl ProductRow {
    fn into_product(self, currency: CurrencyCode) -> Product {
        Product {
            id: self.id,
            slug: self.slug,
            name: self.name,
            price: Price::new(self.price, currency),
            is_active: self.is_active,
        }
    }
}

/// A product as read from a seed file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Repository for product lookups and seeding.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
    currency: CurrencyCode,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository pricing in `currency`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r"
            SELECT id, slug, name, price, is_active
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| r.into_product(self.currency)))
    }

    /// List active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, slug, name, price, is_active
            FROM storefront.product
            WHERE is_active
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_product(self.currency)).collect())
    }

    /// Insert a product, or update the one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_slug(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let (id,): (ProductId,) = sqlx::query_as(
            r"
            INSERT INTO storefront.product (slug, name, description, price, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Deactivate every product. Used before a `--clear` reseed so existing
    /// carts and orders keep their references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE storefront.product SET is_active = FALSE, updated_at = now()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
