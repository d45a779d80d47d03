//! Persistent stock cache: one row per advertiser holding the full listing
//! snapshot from the last successful sync plus sync bookkeeping.
//!
//! Every mutation is a single-row upsert, so no application-level locking of
//! the row is needed beyond the in_progress status flag the engine checks.

use crate::error::Result;
use crate::store::db::Db;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::Row;

/// Sync lifecycle of a cache row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
    InProgress,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
            SyncStatus::InProgress => "in_progress",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "failed" => SyncStatus::Failed,
            "in_progress" => SyncStatus::InProgress,
            _ => SyncStatus::Success,
        }
    }
}

/// One advertiser's cached stock snapshot.
#[derive(Debug, Clone)]
pub struct StockCacheRecord {
    pub advertiser_id: String,
    pub listings: Vec<Value>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub total_count: i64,
    pub sync_status: SyncStatus,
    pub updated_at: DateTime<Utc>,
}

/// Seam between the sync engine and the persistence layer. The production
/// implementation is [`StockStore`]; tests substitute an in-memory fake.
#[async_trait]
pub trait StockCacheRepo: Send + Sync {
    async fn get(&self, advertiser_id: &str) -> Result<Option<StockCacheRecord>>;

    /// Flip the row to in_progress, creating it on first-ever run. This both
    /// acts as the lock and guarantees a row exists for subsequent reads.
    async fn mark_in_progress(&self, advertiser_id: &str) -> Result<()>;

    /// Best-effort failure marker; previously cached listings stay untouched.
    async fn mark_failed(&self, advertiser_id: &str) -> Result<()>;

    /// Wholesale replace of the listing snapshot on a successful sync.
    async fn replace_listings(
        &self,
        advertiser_id: &str,
        listings: Vec<Value>,
        synced_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Rewrite only the listings payload (overlay denormalization), leaving
    /// last_sync_time, total_count and sync_status as they are.
    async fn patch_listings(&self, advertiser_id: &str, listings: Vec<Value>) -> Result<()>;
}

#[derive(Clone)]
pub struct StockStore {
    db: Db,
}

impl StockStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockCacheRepo for StockStore {
    async fn get(&self, advertiser_id: &str) -> Result<Option<StockCacheRecord>> {
        let row = sqlx::query(
            "SELECT advertiser_id, listings, last_sync_time, total_count, sync_status, updated_at
             FROM stock_cache WHERE advertiser_id = $1",
        )
        .bind(advertiser_id)
        .fetch_optional(&self.db.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let listings: Value = row.get("listings");
        let listings = listings.as_array().cloned().unwrap_or_default();
        let sync_status: String = row.get("sync_status");

        Ok(Some(StockCacheRecord {
            advertiser_id: row.get("advertiser_id"),
            listings,
            last_sync_time: row.get("last_sync_time"),
            total_count: row.get("total_count"),
            sync_status: SyncStatus::parse(&sync_status),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn mark_in_progress(&self, advertiser_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO stock_cache (advertiser_id, sync_status)
             VALUES ($1, 'in_progress')
             ON CONFLICT (advertiser_id)
             DO UPDATE SET sync_status = 'in_progress', updated_at = now()",
        )
        .bind(advertiser_id)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, advertiser_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO stock_cache (advertiser_id, sync_status)
             VALUES ($1, 'failed')
             ON CONFLICT (advertiser_id)
             DO UPDATE SET sync_status = 'failed', updated_at = now()",
        )
        .bind(advertiser_id)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn replace_listings(
        &self,
        advertiser_id: &str,
        listings: Vec<Value>,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let total = listings.len() as i64;
        sqlx::query(
            "INSERT INTO stock_cache
                 (advertiser_id, listings, last_sync_time, total_count, sync_status)
             VALUES ($1, $2, $3, $4, 'success')
             ON CONFLICT (advertiser_id)
             DO UPDATE SET listings = EXCLUDED.listings,
                           last_sync_time = EXCLUDED.last_sync_time,
                           total_count = EXCLUDED.total_count,
                           sync_status = 'success',
                           updated_at = now()",
        )
        .bind(advertiser_id)
        .bind(Value::Array(listings))
        .bind(synced_at)
        .bind(total)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn patch_listings(&self, advertiser_id: &str, listings: Vec<Value>) -> Result<()> {
        sqlx::query(
            "UPDATE stock_cache SET listings = $2, updated_at = now()
             WHERE advertiser_id = $1",
        )
        .bind(advertiser_id)
        .bind(Value::Array(listings))
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }
}
