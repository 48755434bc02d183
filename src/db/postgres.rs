use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use super::RecordStore;
use crate::{error::AppResult, models::RecommendationRecord};

/// Creates a PostgreSQL connection pool and applies pending migrations
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

const UPSERT_RECORD: &str = r#"
    INSERT INTO book_recommendations (user_id, item_id, predicted_rating, "timestamp", latency)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (user_id, item_id) DO UPDATE
    SET predicted_rating = EXCLUDED.predicted_rating,
        "timestamp" = EXCLUDED."timestamp",
        latency = EXCLUDED.latency
"#;

const SELECT_RECENT: &str = r#"
    SELECT user_id, item_id, predicted_rating, "timestamp", latency
    FROM book_recommendations
    ORDER BY "timestamp" DESC, user_id, item_id
    LIMIT $1
"#;

/// Records kept in the `book_recommendations` table, decimals as NUMERIC
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordStore for PostgresRecordStore {
    async fn put(&self, record: &RecommendationRecord) -> AppResult<()> {
        sqlx::query(UPSERT_RECORD)
            .bind(&record.user_id)
            .bind(&record.item_id)
            .bind(&record.predicted_rating)
            .bind(record.timestamp)
            .bind(&record.latency)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<RecommendationRecord>> {
        let rows = sqlx::query(SELECT_RECENT)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> AppResult<RecommendationRecord> {
                Ok(RecommendationRecord {
                    user_id: row.try_get("user_id")?,
                    item_id: row.try_get("item_id")?,
                    predicted_rating: row.try_get("predicted_rating")?,
                    timestamp: row.try_get("timestamp")?,
                    latency: row.try_get("latency")?,
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
