//! Human-readable order numbers from an atomic counter.
//!
//! Numbers look like `ORD-000042`: prefix, separator, and the counter value
//! zero-padded to a minimum width. The counter row is incremented in a single
//! atomic statement, so concurrent checkouts never share a number. If the
//! increment fails, a timestamp-based number is returned instead so checkout
//! is not blocked; such numbers are not guaranteed unique and the order
//! insert's unique constraint is the final guard.

use std::future::Future;

use chrono::Utc;
use tracing::instrument;

use souq_core::{OrderNumber, OrderNumberFormat};

use crate::db::RepositoryError;

/// Counter key for order numbers.
pub const ORDER_COUNTER_KEY: &str = "order_counter";

/// Storage for the order counter.
pub trait OrderNumberStore: Send + Sync {
    /// Atomically increment the counter (creating it at 1) and return the
    /// new value.
    fn increment(&self, key: &str) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Current counter value without incrementing.
    fn current(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<i64>, RepositoryError>> + Send;

    /// Set the counter to zero, creating it if needed.
    fn reset(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Whether an order already carries `number`.
    fn order_number_exists(
        &self,
        number: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Generates order numbers in a configured format.
pub struct OrderNumberSequencer<'a, S> {
    store: &'a S,
    format: &'a OrderNumberFormat,
}

impl<'a, S: OrderNumberStore> OrderNumberSequencer<'a, S> {
    /// Create a sequencer.
    #[must_use]
    pub const fn new(store: &'a S, format: &'a OrderNumberFormat) -> Self {
        Self { store, format }
    }

    /// Generate the next order number.
    ///
    /// Never fails: a counter error is logged and a timestamp-based number is
    /// returned.
    #[instrument(skip(self))]
    pub async fn generate_order_number(&self) -> OrderNumber {
        match self.store.increment(ORDER_COUNTER_KEY).await {
            Ok(sequence) => {
                let number = self.format.format(sequence);
                tracing::debug!(%number, "Order number generated");
                number
            }
            Err(e) => {
                let number = self.format.fallback(Utc::now().timestamp_millis());
                tracing::warn!(error = %e, %number, "Order counter failed, using timestamp order number");
                number
            }
        }
    }

    /// Whether no order carries `number` yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn is_order_number_unique(&self, number: &OrderNumber) -> Result<bool, RepositoryError> {
        Ok(!self.store.order_number_exists(number.as_str()).await?)
    }

    /// The number the next successful [`generate_order_number`] would use if
    /// nothing else generates one first. Does not consume a number.
    ///
    /// [`generate_order_number`]: Self::generate_order_number
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the counter cannot be read.
    pub async fn get_next_order_number(&self) -> Result<OrderNumber, RepositoryError> {
        let current = self.store.current(ORDER_COUNTER_KEY).await?.unwrap_or(0);
        Ok(self.format.format(current + 1))
    }

    /// Reset the counter so the next number is sequence 1.
    ///
    /// Administrative only: numbers issued before the reset will be issued
    /// again and collide with existing orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the counter cannot be written.
    pub async fn reset_counter(&self) -> Result<(), RepositoryError> {
        self.store.reset(ORDER_COUNTER_KEY).await?;
        tracing::warn!("Order counter reset to 0");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Records the level of every event.
    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    /// In-memory counter store.
    #[derive(Default)]
    pub(crate) struct MemoryCounterStore {
        counters: Mutex<HashMap<String, i64>>,
        pub(crate) existing: Mutex<HashSet<String>>,
        pub(crate) failing: AtomicBool,
    }

    impl OrderNumberStore for MemoryCounterStore {
        async fn increment(&self, key: &str) -> Result<i64, RepositoryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            let mut counters = self.counters.lock().unwrap();
            let value = counters.entry(key.to_owned()).or_insert(0);
            *value += 1;
            Ok(*value)
        }

        async fn current(&self, key: &str) -> Result<Option<i64>, RepositoryError> {
            Ok(self.counters.lock().unwrap().get(key).copied())
        }

        async fn reset(&self, key: &str) -> Result<(), RepositoryError> {
            self.counters.lock().unwrap().insert(key.to_owned(), 0);
            Ok(())
        }

        async fn order_number_exists(&self, number: &str) -> Result<bool, RepositoryError> {
            Ok(self.existing.lock().unwrap().contains(number))
        }
    }

    #[tokio::test]
    async fn test_first_number_starts_at_one() {
        let store = MemoryCounterStore::default();
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        assert_eq!(sequencer.generate_order_number().await.as_str(), "ORD-000001");
        assert_eq!(sequencer.generate_order_number().await.as_str(), "ORD-000002");
    }

    #[tokio::test]
    async fn test_counter_at_five_yields_six() {
        let store = MemoryCounterStore::default();
        store.counters.lock().unwrap().insert(ORDER_COUNTER_KEY.to_owned(), 5);
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        assert_eq!(sequencer.get_next_order_number().await.unwrap().as_str(), "ORD-000006");
        assert_eq!(sequencer.generate_order_number().await.as_str(), "ORD-000006");
    }

    #[tokio::test]
    async fn test_numbers_are_distinct() {
        let store = MemoryCounterStore::default();
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        let mut seen = HashSet::new();
        for _ in 0..250 {
            assert!(seen.insert(sequencer.generate_order_number().await));
        }
    }

    #[tokio::test]
    async fn test_counter_failure_falls_back_to_timestamp() {
        let store = MemoryCounterStore::default();
        store.failing.store(true, Ordering::SeqCst);
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        let before = Utc::now().timestamp_millis();
        let number = sequencer.generate_order_number().await;
        let after = Utc::now().timestamp_millis();

        let millis: i64 = number.as_str().strip_prefix("ORD-").unwrap().parse().unwrap();
        assert!((before..=after).contains(&millis));
    }

    #[tokio::test]
    async fn test_counter_failure_logs_warning() {
        let store = MemoryCounterStore::default();
        store.failing.store(true, Ordering::SeqCst);
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        let recorder = LevelRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        sequencer.generate_order_number().await;

        let levels = recorder.0.lock().unwrap().clone();
        assert!(levels.contains(&Level::WARN));
        assert!(!levels.contains(&Level::ERROR));
    }

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let store = MemoryCounterStore::default();
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        assert_eq!(sequencer.get_next_order_number().await.unwrap().as_str(), "ORD-000001");
        assert_eq!(sequencer.get_next_order_number().await.unwrap().as_str(), "ORD-000001");
        assert_eq!(sequencer.generate_order_number().await.as_str(), "ORD-000001");
    }

    #[tokio::test]
    async fn test_reset_restarts_sequence() {
        let store = MemoryCounterStore::default();
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        for _ in 0..3 {
            sequencer.generate_order_number().await;
        }
        sequencer.reset_counter().await.unwrap();

        assert_eq!(sequencer.generate_order_number().await.as_str(), "ORD-000001");
    }

    #[tokio::test]
    async fn test_uniqueness_check() {
        let store = MemoryCounterStore::default();
        store.existing.lock().unwrap().insert("ORD-000001".to_owned());
        let format = OrderNumberFormat::default();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        let taken = OrderNumber::parse("ORD-000001").unwrap();
        let free = OrderNumber::parse("ORD-000002").unwrap();
        assert!(!sequencer.is_order_number_unique(&taken).await.unwrap());
        assert!(sequencer.is_order_number_unique(&free).await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_format() {
        let store = MemoryCounterStore::default();
        let format = OrderNumberFormat::new("SOUQ", "/", 4).unwrap();
        let sequencer = OrderNumberSequencer::new(&store, &format);

        assert_eq!(sequencer.generate_order_number().await.as_str(), "SOUQ/0001");
    }
}
