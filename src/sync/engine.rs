//! Fetch-and-merge sync engine.
//!
//! One run authenticates once, walks every stock page sequentially, filters
//! to active listings and replaces the cached snapshot wholesale. A row that
//! is already in_progress and was touched within the lock window means some
//! other run owns the sync, so this one skips instead of double-fetching.

use crate::error::{Error, Result};
use crate::providers::StockProvider;
use crate::stock::registration::is_active_listing;
use crate::store::stock::{StockCacheRepo, SyncStatus};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// An in_progress row older than this is treated as a stale crash leftover
/// and the lock is stolen.
pub const LOCK_WINDOW_MINUTES: i64 = 10;

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Result of one sync attempt. `Skipped` and `Failed` are expected outcomes,
/// not errors; callers decide how loudly to report them.
#[derive(Debug)]
pub enum SyncOutcome {
    Success { total_listings: usize },
    Skipped,
    Failed { error: Error },
}

impl SyncOutcome {
    pub fn as_json(&self) -> Value {
        match self {
            SyncOutcome::Success { total_listings } => json!({
                "success": true,
                "totalListings": total_listings,
            }),
            SyncOutcome::Skipped => json!({
                "success": false,
                "skipped": true,
            }),
            SyncOutcome::Failed { error } => json!({
                "success": false,
                "error": error.to_string(),
            }),
        }
    }
}

pub struct SyncEngine<P, R> {
    provider: P,
    cache: R,
    advertiser_id: String,
    page_size: u32,
}

impl<P, R> SyncEngine<P, R>
where
    P: StockProvider,
    R: StockCacheRepo,
{
    pub fn new(provider: P, cache: R, advertiser_id: impl Into<String>) -> Self {
        Self {
            provider,
            cache,
            advertiser_id: advertiser_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn advertiser_id(&self) -> &str {
        &self.advertiser_id
    }

    /// Run one full sync, honouring the in_progress lock.
    pub async fn run_sync(&self) -> SyncOutcome {
        match self.cache.get(&self.advertiser_id).await {
            Ok(Some(record)) if record.sync_status == SyncStatus::InProgress => {
                let age = Utc::now() - record.updated_at;
                if age < chrono::Duration::minutes(LOCK_WINDOW_MINUTES) {
                    info!(
                        advertiser_id = %self.advertiser_id,
                        lock_age_secs = age.num_seconds(),
                        "sync already in progress, skipping"
                    );
                    return SyncOutcome::Skipped;
                }
                warn!(
                    advertiser_id = %self.advertiser_id,
                    lock_age_secs = age.num_seconds(),
                    "stale in_progress lock, taking over"
                );
            }
            Ok(_) => {}
            Err(error) => return SyncOutcome::Failed { error },
        }

        if let Err(error) = self.cache.mark_in_progress(&self.advertiser_id).await {
            return SyncOutcome::Failed { error };
        }

        match self.fetch_and_persist().await {
            Ok(total_listings) => {
                info!(
                    advertiser_id = %self.advertiser_id,
                    total_listings,
                    "stock sync complete"
                );
                SyncOutcome::Success { total_listings }
            }
            Err(error) => {
                error!(advertiser_id = %self.advertiser_id, %error, "stock sync failed");
                // Best effort: the original error is what callers care about.
                if let Err(mark_err) = self.cache.mark_failed(&self.advertiser_id).await {
                    error!(%mark_err, "could not record failed sync status");
                }
                SyncOutcome::Failed { error }
            }
        }
    }

    async fn fetch_and_persist(&self) -> Result<usize> {
        let token = self.provider.authenticate().await?;

        let first = self
            .provider
            .fetch_page(&token, 1, self.page_size)
            .await?;
        let total_pages = first
            .total_pages
            .or_else(|| {
                first
                    .total_results
                    .map(|total| (total as u32).div_ceil(self.page_size))
            })
            .unwrap_or(1)
            .max(1);

        let mut listings: Vec<Value> = Vec::new();
        listings.extend(first.results.into_iter().filter(is_active_listing));
        info!(
            advertiser_id = %self.advertiser_id,
            page = 1,
            total_pages,
            accumulated = listings.len(),
            "fetched stock page"
        );

        for page in 2..=total_pages {
            let batch = self.provider.fetch_page(&token, page, self.page_size).await?;
            listings.extend(batch.results.into_iter().filter(is_active_listing));
            info!(
                advertiser_id = %self.advertiser_id,
                page,
                total_pages,
                accumulated = listings.len(),
                "fetched stock page"
            );
        }

        let total = listings.len();
        self.cache
            .replace_listings(&self.advertiser_id, listings, Utc::now())
            .await?;
        Ok(total)
    }
}
