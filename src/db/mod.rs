use std::sync::Arc;

use crate::{
    config::{Config, RecordStoreKind},
    error::AppResult,
    models::RecommendationRecord,
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryRecordStore;
pub use postgres::{create_pool, PostgresRecordStore};
pub use self::redis::{create_redis_client, RedisRecordStore};

/// Durable, append-style store for recommendation audit records
///
/// Writes are upserts keyed by (user_id, item_id). Implementations must accept
/// concurrent independent writes; callers never serialize them.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes a single record
    async fn put(&self, record: &RecommendationRecord) -> AppResult<()>;

    /// Most recent records, newest first, at most `limit`
    async fn recent(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Connects the backend selected by `RECORD_STORE`.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.record_store {
        RecordStoreKind::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            Arc::new(PostgresRecordStore::new(pool))
        }
        RecordStoreKind::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisRecordStore::new(client))
        }
        RecordStoreKind::Memory => Arc::new(MemoryRecordStore::new()),
    };

    tracing::info!(backend = store.name(), "Record store ready");
    Ok(store)
}
