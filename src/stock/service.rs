//! Read-side service over the stock cache: list, lookup with registry
//! fallback, sync status and the dealer reserve-link overlay.

use crate::error::{Error, Result};
use crate::providers::autotrader::AutoTraderProvider;
use crate::providers::RegistryLookup;
use crate::stock::registration::{listing_registration, normalize_registration};
use crate::store::metadata::MetadataStore;
use crate::store::stock::{StockCacheRepo, StockStore, SyncStatus};
use crate::sync::engine::{SyncEngine, SyncOutcome};
use crate::sync::scheduler::SYNC_HOURS;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListResponse {
    pub results: Vec<Value>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub total_vehicles: i64,
    pub sync_status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub last_sync_time: Option<DateTime<Utc>>,
    pub total_vehicles: i64,
    pub sync_status: String,
    pub next_sync_times: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub source: &'static str,
    pub vehicle: Value,
    pub features: Value,
    pub media: Value,
}

fn next_sync_times() -> Vec<String> {
    SYNC_HOURS.iter().map(|h| format!("{h:02}:00")).collect()
}

/// First cached listing whose registration normalizes to `registration`
/// (which must itself already be normalized).
pub fn find_in_listings<'a>(listings: &'a [Value], registration: &str) -> Option<&'a Value> {
    listings.iter().find(|listing| {
        listing_registration(listing)
            .map(|reg| normalize_registration(reg) == registration)
            .unwrap_or(false)
    })
}

/// Injects the dealer reserve-link overlay into each listing's vehicle
/// object. Listings without an overlay entry get an empty link so the
/// field is always present for clients.
pub fn merge_reserve_links(listings: Vec<Value>, links: &HashMap<String, String>) -> Vec<Value> {
    listings
        .into_iter()
        .map(|mut listing| {
            let link = listing_registration(&listing)
                .and_then(|reg| links.get(&normalize_registration(reg)))
                .cloned()
                .unwrap_or_default();
            if let Some(vehicle) = listing.get_mut("vehicle") {
                vehicle["reserveLink"] = Value::String(link);
            }
            listing
        })
        .collect()
}

/// Sets `vehicle.reserveLink` on every listing matching the normalized
/// registration. Returns whether anything changed.
pub fn patch_reserve_link(listings: &mut [Value], registration: &str, link: &str) -> bool {
    let mut touched = false;
    for listing in listings.iter_mut() {
        let matches = listing_registration(listing)
            .map(|reg| normalize_registration(reg) == registration)
            .unwrap_or(false);
        if matches {
            if let Some(vehicle) = listing.get_mut("vehicle") {
                vehicle["reserveLink"] = Value::String(link.to_string());
                touched = true;
            }
        }
    }
    touched
}

fn local_hit(listing: &Value) -> LookupResponse {
    LookupResponse {
        source: "local",
        vehicle: listing.get("vehicle").cloned().unwrap_or(json!({})),
        features: listing.get("features").cloned().unwrap_or(json!([])),
        media: listing.get("media").cloned().unwrap_or(json!({})),
    }
}

/// Cache-first lookup: scan the snapshot, then ask the registry. Registry
/// transport/API errors count as a miss so a flaky upstream never turns a
/// lookup into a 500.
pub async fn lookup_vehicle(
    listings: &[Value],
    registry: Option<&dyn RegistryLookup>,
    registration: &str,
) -> Result<LookupResponse> {
    if let Some(listing) = find_in_listings(listings, registration) {
        return Ok(local_hit(listing));
    }

    let Some(registry) = registry else {
        return Err(Error::NotFound);
    };

    info!(registration, "not in local stock, trying registry lookup");
    match registry.lookup(registration).await {
        Ok(Some(vehicle)) => Ok(LookupResponse {
            source: "ukvd",
            vehicle,
            features: json!([]),
            media: json!({"images": []}),
        }),
        Ok(None) => Err(Error::NotFound),
        Err(error) => {
            warn!(registration, %error, "registry lookup error, treating as miss");
            Err(Error::NotFound)
        }
    }
}

#[derive(Clone)]
pub struct StockService {
    cache: StockStore,
    overlay: MetadataStore,
    registry: Option<Arc<dyn RegistryLookup>>,
    engine: Arc<SyncEngine<AutoTraderProvider, StockStore>>,
    advertiser_id: String,
}

impl StockService {
    pub fn new(
        cache: StockStore,
        overlay: MetadataStore,
        registry: Option<Arc<dyn RegistryLookup>>,
        engine: Arc<SyncEngine<AutoTraderProvider, StockStore>>,
    ) -> Self {
        let advertiser_id = engine.advertiser_id().to_string();
        Self {
            cache,
            overlay,
            registry,
            engine,
            advertiser_id,
        }
    }

    /// Cached stock with the reserve-link overlay applied. A cold cache (no
    /// row yet) triggers one inline sync before answering.
    pub async fn cached_stock(&self) -> Result<StockListResponse> {
        let mut record = self.cache.get(&self.advertiser_id).await?;
        if record.is_none() {
            info!(advertiser_id = %self.advertiser_id, "cache empty, bootstrapping sync");
            self.engine.run_sync().await;
            record = self.cache.get(&self.advertiser_id).await?;
        }

        let Some(record) = record else {
            return Ok(StockListResponse {
                results: Vec::new(),
                last_sync_time: None,
                total_vehicles: 0,
                sync_status: SyncStatus::Failed.as_str().to_string(),
            });
        };

        let links = self.overlay.reserve_links().await?;
        Ok(StockListResponse {
            results: merge_reserve_links(record.listings, &links),
            last_sync_time: record.last_sync_time,
            total_vehicles: record.total_count,
            sync_status: record.sync_status.as_str().to_string(),
        })
    }

    /// Lookup by registration, cache first then registry fallback.
    pub async fn lookup(&self, raw_registration: &str) -> Result<LookupResponse> {
        let registration = normalize_registration(raw_registration);
        let listings = self
            .cache
            .get(&self.advertiser_id)
            .await?
            .map(|record| record.listings)
            .unwrap_or_default();
        lookup_vehicle(&listings, self.registry.as_deref(), &registration).await
    }

    pub async fn trigger_sync(&self) -> SyncOutcome {
        self.engine.run_sync().await
    }

    pub async fn sync_status(&self) -> Result<SyncStatusResponse> {
        let record = self.cache.get(&self.advertiser_id).await?;
        Ok(match record {
            Some(record) => SyncStatusResponse {
                last_sync_time: record.last_sync_time,
                total_vehicles: record.total_count,
                sync_status: record.sync_status.as_str().to_string(),
                next_sync_times: next_sync_times(),
            },
            None => SyncStatusResponse {
                last_sync_time: None,
                total_vehicles: 0,
                sync_status: "unknown".to_string(),
                next_sync_times: next_sync_times(),
            },
        })
    }

    /// Stores a reserve link in the overlay and eagerly patches the cached
    /// listing so readers see it without waiting for the next sync.
    pub async fn set_reserve_link(&self, raw_registration: &str, link: &str) -> Result<()> {
        let registration = normalize_registration(raw_registration);
        self.overlay.upsert(&registration, link).await?;

        if let Some(record) = self.cache.get(&self.advertiser_id).await? {
            let mut listings = record.listings;
            if patch_reserve_link(&mut listings, &registration, link) {
                self.cache
                    .patch_listings(&self.advertiser_id, listings)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRegistry {
        calls: AtomicUsize,
        answer: Option<Value>,
    }

    impl CountingRegistry {
        fn hit(vehicle: Value) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                answer: Some(vehicle),
            }
        }

        fn miss() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                answer: None,
            }
        }
    }

    #[async_trait]
    impl RegistryLookup for CountingRegistry {
        async fn lookup(&self, _registration: &str) -> Result<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    fn listing(reg: &str) -> Value {
        json!({
            "vehicle": {"registration": reg, "make": "FORD"},
            "features": [{"name": "Alloy Wheels"}],
            "media": {"images": ["a.jpg"]}
        })
    }

    #[tokio::test]
    async fn local_hit_never_calls_registry() {
        let listings = vec![listing("AB12CDE")];
        let registry = CountingRegistry::miss();

        let out = lookup_vehicle(&listings, Some(&registry), "AB12CDE")
            .await
            .unwrap();
        assert_eq!(out.source, "local");
        assert_eq!(out.vehicle["make"], "FORD");
        assert_eq!(out.features, json!([{"name": "Alloy Wheels"}]));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_match_ignores_spacing_and_case() {
        let listings = vec![listing("AB12CDE")];
        let normalized = normalize_registration("ab12 cde");
        let out = lookup_vehicle(&listings, None, &normalized).await.unwrap();
        assert_eq!(out.source, "local");
    }

    #[tokio::test]
    async fn registry_fallback_answers_on_miss() {
        let listings = vec![listing("AB12CDE")];
        let registry = CountingRegistry::hit(json!({"registration": "XY34ZZZ", "make": "BMW"}));

        let out = lookup_vehicle(&listings, Some(&registry), "XY34ZZZ")
            .await
            .unwrap();
        assert_eq!(out.source, "ukvd");
        assert_eq!(out.vehicle["make"], "BMW");
        assert_eq!(out.media, json!({"images": []}));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_miss_is_not_found() {
        let registry = CountingRegistry::miss();
        let err = lookup_vehicle(&[], Some(&registry), "ZZ99ZZZ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_registry_configured_is_not_found() {
        let err = lookup_vehicle(&[], None, "ZZ99ZZZ").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn overlay_merge_defaults_to_empty_link() {
        let mut links = HashMap::new();
        links.insert("AB12CDE".to_string(), "https://pay.example/ab12".to_string());

        let merged = merge_reserve_links(vec![listing("AB12CDE"), listing("XY34ZZZ")], &links);
        assert_eq!(merged[0]["vehicle"]["reserveLink"], "https://pay.example/ab12");
        assert_eq!(merged[1]["vehicle"]["reserveLink"], "");
    }

    #[test]
    fn reserve_link_patch_touches_only_matches() {
        let mut listings = vec![listing("AB12CDE"), listing("XY34ZZZ")];
        let touched = patch_reserve_link(&mut listings, "AB12CDE", "https://pay.example/ab12");
        assert!(touched);
        assert_eq!(listings[0]["vehicle"]["reserveLink"], "https://pay.example/ab12");
        assert_eq!(listings[1]["vehicle"].get("reserveLink"), None);

        let mut listings = vec![listing("AB12CDE")];
        assert!(!patch_reserve_link(&mut listings, "ZZ99ZZZ", "x"));
    }

    #[test]
    fn next_sync_times_are_zero_padded() {
        assert_eq!(next_sync_times(), vec!["06:00", "12:00", "18:00"]);
    }
}
