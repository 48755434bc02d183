use redis::AsyncCommands;
use redis::Client;

use super::RecordStore;
use crate::{error::AppResult, models::RecommendationRecord};

/// Sorted set of record keys scored by timestamp, for monitoring reads
const RECENT_INDEX_KEY: &str = "rec:recent";

/// Entries kept in the recent index
const RECENT_INDEX_CAPACITY: isize = 10_000;

/// Creates a Redis client for the record store
///
/// Connections are multiplexed per call, so the client is cheap to share.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Records stored as JSON strings under `rec:{user_id}:{item_id}`
#[derive(Clone)]
pub struct RedisRecordStore {
    redis_client: Client,
}

impl RedisRecordStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl RecordStore for RedisRecordStore {
    async fn put(&self, record: &RecommendationRecord) -> AppResult<()> {
        let key = record.key().to_string();
        let json = serde_json::to_string(record)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let _: () = redis::pipe()
            .atomic()
            .set(&key, json)
            .ignore()
            .zadd(RECENT_INDEX_KEY, &key, record.timestamp)
            .ignore()
            .zremrangebyrank(RECENT_INDEX_KEY, 0, -(RECENT_INDEX_CAPACITY + 1))
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!(key = %key, "Record written to Redis");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let keys: Vec<String> = conn.zrevrange(RECENT_INDEX_KEY, 0, stop).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = conn.mget(&keys).await?;
        let mut records = Vec::with_capacity(values.len());
        // keys trimmed from the index may already be gone
        for json in values.into_iter().flatten() {
            records.push(serde_json::from_str(&json)?);
        }
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
