use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::RecordStore;
use crate::{
    error::AppResult,
    models::{RecommendationRecord, RecordKey},
};

/// Process-local record store for development and tests
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    records: HashMap<RecordKey, RecommendationRecord>,
    /// Monotonic write counter, used to order records written in the same second
    sequence: u64,
    written_at: HashMap<RecordKey, u64>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, user_id: &str, item_id: &str) -> Option<RecommendationRecord> {
        let key = RecordKey {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
        };
        self.inner.read().await.records.get(&key).cloned()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &RecommendationRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.sequence += 1;
        let sequence = inner.sequence;
        inner.written_at.insert(record.key(), sequence);
        inner.records.insert(record.key(), record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<&RecommendationRecord> = inner.records.values().collect();
        records.sort_by_key(|record| {
            let sequence = inner.written_at.get(&record.key()).copied().unwrap_or(0);
            std::cmp::Reverse((record.timestamp, sequence))
        });
        Ok(records.into_iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn record(user_id: &str, item_id: &str, timestamp: i64) -> RecommendationRecord {
        RecommendationRecord {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            predicted_rating: BigDecimal::from(4),
            timestamp,
            latency: BigDecimal::from(0),
        }
    }

    #[tokio::test]
    async fn test_put_upserts_by_composite_key() {
        let store = MemoryRecordStore::new();
        store.put(&record("u1", "a", 10)).await.unwrap();
        store.put(&record("u1", "b", 10)).await.unwrap();
        store.put(&record("u1", "a", 20)).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("u1", "a").await.unwrap().timestamp, 20);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let store = MemoryRecordStore::new();
        store.put(&record("u1", "a", 10)).await.unwrap();
        store.put(&record("u2", "b", 30)).await.unwrap();
        store.put(&record("u3", "c", 20)).await.unwrap();
        store.put(&record("u4", "d", 30)).await.unwrap();

        let recent = store.recent(3).await.unwrap();
        let items: Vec<&str> = recent.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(items, vec!["d", "b", "c"]);
    }
}
