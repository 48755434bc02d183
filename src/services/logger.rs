use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    db::RecordStore,
    error::AppError,
    models::RecommendationRecord,
    services::decimal::{latency_decimal, to_bounded_decimal_or_sentinel},
};

/// Why a single record write did not land
#[derive(thiserror::Error, Debug)]
pub enum LogWriteFailure {
    #[error("record store rejected the write: {0}")]
    Store(#[from] AppError),

    #[error("write abandoned after {0:?}")]
    TimedOut(Duration),

    #[error("write task failed: {0}")]
    Task(String),
}

/// Outcome of logging one top-k batch
#[derive(Debug, Default)]
pub struct LogSummary {
    pub attempted: usize,
    pub written: usize,
    pub failures: Vec<(String, LogWriteFailure)>,
}

impl LogSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.written == self.attempted
    }
}

/// Turns served recommendations into audit records and writes them
#[derive(Clone)]
pub struct RecommendationLogger {
    store: Arc<dyn RecordStore>,
    precision: u64,
    write_timeout: Duration,
}

impl RecommendationLogger {
    pub fn new(store: Arc<dyn RecordStore>, precision: u64, write_timeout: Duration) -> Self {
        Self {
            store,
            precision,
            write_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Builds the record for one item. Unrepresentable values become `0.0`.
    pub fn build_record(
        &self,
        user_id: &str,
        item_id: &str,
        predicted_value: f64,
        started_at: Instant,
        now: Instant,
    ) -> RecommendationRecord {
        RecommendationRecord {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            predicted_rating: to_bounded_decimal_or_sentinel(
                predicted_value,
                self.precision,
                "predicted_rating",
            ),
            timestamp: Utc::now().timestamp(),
            latency: latency_decimal(now.saturating_duration_since(started_at), self.precision),
        }
    }

    /// Writes one record, bounded by the write timeout.
    pub async fn log(
        &self,
        user_id: &str,
        item_id: &str,
        predicted_value: f64,
        started_at: Instant,
        now: Instant,
    ) -> Result<(), LogWriteFailure> {
        let record = self.build_record(user_id, item_id, predicted_value, started_at, now);
        write_with_timeout(self.store.as_ref(), &record, self.write_timeout).await
    }

    /// Writes one record per item concurrently and waits for every attempt.
    ///
    /// Failures are captured per item and never abort the other writes.
    pub async fn log_all(
        &self,
        user_id: &str,
        items: &[(String, f64)],
        started_at: Instant,
        now: Instant,
    ) -> LogSummary {
        let mut tasks = Vec::with_capacity(items.len());

        for (item_id, predicted_value) in items {
            let record = self.build_record(user_id, item_id, *predicted_value, started_at, now);
            let store = self.store.clone();
            let timeout = self.write_timeout;
            let task = tokio::spawn(async move {
                write_with_timeout(store.as_ref(), &record, timeout).await
            });
            tasks.push((item_id.clone(), task));
        }

        let mut summary = LogSummary {
            attempted: tasks.len(),
            ..LogSummary::default()
        };

        for (item_id, task) in tasks {
            let outcome = match task.await {
                Ok(result) => result,
                Err(e) => Err(LogWriteFailure::Task(e.to_string())),
            };

            match outcome {
                Ok(()) => {
                    tracing::info!(user_id = %user_id, item_id = %item_id, "Logged recommendation");
                    summary.written += 1;
                }
                Err(e) => {
                    tracing::error!(
                        user_id = %user_id,
                        item_id = %item_id,
                        backend = self.store.name(),
                        error = %e,
                        "Failed to log recommendation"
                    );
                    summary.failures.push((item_id, e));
                }
            }
        }

        if !summary.is_complete() {
            tracing::warn!(
                user_id = %user_id,
                written = summary.written,
                failed = summary.failures.len(),
                "Partial recommendation logging failure"
            );
        }

        summary
    }
}

/// Dropping the write future on timeout abandons the write.
async fn write_with_timeout(
    store: &dyn RecordStore,
    record: &RecommendationRecord,
    timeout: Duration,
) -> Result<(), LogWriteFailure> {
    match tokio::time::timeout(timeout, store.put(record)).await {
        Ok(result) => result.map_err(LogWriteFailure::from),
        Err(_) => Err(LogWriteFailure::TimedOut(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryRecordStore, MockRecordStore};
    use crate::error::AppResult;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    /// Never finishes writes for one item within any sane timeout
    struct StallingStore {
        inner: MemoryRecordStore,
        stalled_item: &'static str,
    }

    #[async_trait::async_trait]
    impl RecordStore for StallingStore {
        async fn put(&self, record: &RecommendationRecord) -> AppResult<()> {
            if record.item_id == self.stalled_item {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.inner.put(record).await
        }

        async fn recent(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
            self.inner.recent(limit).await
        }

        fn name(&self) -> &'static str {
            "stalling"
        }
    }

    fn logger_with(store: Arc<dyn RecordStore>) -> RecommendationLogger {
        RecommendationLogger::new(store, 15, Duration::from_millis(200))
    }

    fn items() -> Vec<(String, f64)> {
        ["d", "a", "c", "e", "b"]
            .iter()
            .zip([0.0, 0.1, 0.3, 0.5, 0.9])
            .map(|(item, score)| (item.to_string(), score))
            .collect()
    }

    #[test]
    fn test_build_record_fields() {
        let logger = logger_with(Arc::new(MemoryRecordStore::new()));
        let started_at = Instant::now();
        let now = started_at + Duration::from_millis(125);

        let before = Utc::now().timestamp();
        let record = logger.build_record("u1", "b", 4.25, started_at, now);

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.item_id, "b");
        assert_eq!(record.predicted_rating, BigDecimal::from_str("4.25").unwrap());
        assert_eq!(record.latency, BigDecimal::from_str("0.125").unwrap());
        assert!(record.timestamp >= before);
    }

    #[test]
    fn test_build_record_uses_sentinel_for_nan() {
        let logger = logger_with(Arc::new(MemoryRecordStore::new()));
        let now = Instant::now();
        let record = logger.build_record("u1", "b", f64::NAN, now, now);
        assert_eq!(record.predicted_rating, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_log_writes_single_record() {
        let store = MemoryRecordStore::new();
        let logger = logger_with(Arc::new(store.clone()));
        let now = Instant::now();

        tokio_test::assert_ok!(logger.log("u1", "a", 3.0, now, now).await);
        assert!(store.get("u1", "a").await.is_some());
    }

    #[tokio::test]
    async fn test_log_all_writes_every_item() {
        let store = MemoryRecordStore::new();
        let logger = logger_with(Arc::new(store.clone()));
        let now = Instant::now();

        let summary = logger.log_all("u1", &items(), now, now).await;

        assert!(summary.is_complete());
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.written, 5);
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn test_log_all_continues_after_store_error() {
        let mut mock = MockRecordStore::new();
        mock.expect_put().times(5).returning(|record| {
            if record.item_id == "c" {
                Err(AppError::Internal("connection reset".to_string()))
            } else {
                Ok(())
            }
        });
        mock.expect_name().return_const("mock");

        let logger = logger_with(Arc::new(mock));
        let now = Instant::now();
        let summary = logger.log_all("u1", &items(), now, now).await;

        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.written, 4);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "c");
        assert!(matches!(summary.failures[0].1, LogWriteFailure::Store(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_all_abandons_stalled_write() {
        let inner = MemoryRecordStore::new();
        let store = StallingStore {
            inner: inner.clone(),
            stalled_item: "c",
        };
        let logger = logger_with(Arc::new(store));
        let now = Instant::now();

        let summary = logger.log_all("u1", &items(), now, now).await;

        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.written, 4);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "c");
        assert!(matches!(
            summary.failures[0].1,
            LogWriteFailure::TimedOut(timeout) if timeout == Duration::from_millis(200)
        ));
        assert_eq!(inner.len().await, 4);
        assert!(inner.get("u1", "c").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_times_out_single_write() {
        let store = StallingStore {
            inner: MemoryRecordStore::new(),
            stalled_item: "a",
        };
        let logger = logger_with(Arc::new(store));
        let now = Instant::now();

        let result = logger.log("u1", "a", 1.0, now, now).await;
        assert!(matches!(result, Err(LogWriteFailure::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_log_surfaces_store_error_to_caller() {
        let mut mock = MockRecordStore::new();
        mock.expect_put()
            .times(1)
            .returning(|_| Err(AppError::Internal("disk full".to_string())));

        let logger = logger_with(Arc::new(mock));
        let now = Instant::now();
        let result = logger.log("u1", "a", 1.0, now, now).await;
        assert!(matches!(result, Err(LogWriteFailure::Store(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_is_complete() {
        let logger = logger_with(Arc::new(MemoryRecordStore::new()));
        let now = Instant::now();
        let summary = logger.log_all("u1", &[], now, now).await;
        assert!(summary.is_complete());
        assert_eq!(summary.attempted, 0);
    }
}
