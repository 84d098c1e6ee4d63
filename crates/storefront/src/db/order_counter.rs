//! Named counters in `storefront.counter`.

use sqlx::PgPool;

use super::RepositoryError;
use crate::services::order_number::OrderNumberStore;

/// Counter-backed order number storage.
pub struct PgOrderNumberStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgOrderNumberStore<'a> {
    /// Create a counter store.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl OrderNumberStore for PgOrderNumberStore<'_> {
    async fn increment(&self, key: &str) -> Result<i64, RepositoryError> {
        // Single statement: the row lock taken by the upsert serializes
        // concurrent callers, and each sees its own incremented value.
        let (value,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO storefront.counter (key, value)
            VALUES ($1, 1)
            ON CONFLICT (key) DO UPDATE
            SET value = storefront.counter.value + 1, updated_at = now()
            RETURNING value
            ",
        )
        .bind(key)
        .fetch_one(self.pool)
        .await?;

        Ok(value)
    }

    async fn current(&self, key: &str) -> Result<Option<i64>, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM storefront.counter WHERE key = $1")
            .bind(key)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|(v,)| v))
    }

    async fn reset(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.counter (key, value)
            VALUES ($1, 0)
            ON CONFLICT (key) DO UPDATE SET value = 0, updated_at = now()
            ",
        )
        .bind(key)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    async fn order_number_exists(&self, number: &str) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM storefront.order WHERE order_number = $1)",
        )
        .bind(number)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
