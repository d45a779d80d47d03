//! AutoTrader stock feed client.
//!
//! Two-step flow: POST form credentials to `/authenticate` for a short-lived
//! bearer token, then GET `/stock` pages with it. Listings are kept as
//! opaque JSON because the feed's vehicle shape is wide and we only ever
//! inspect a handful of fields.

use crate::error::{Error, Result};
use crate::providers::{truncate_for_log, StockPage, StockProvider};
use crate::util::env::{env_opt, env_req};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api-sandbox.autotrader.co.uk";

#[derive(Debug, Clone)]
pub struct AutoTraderConfig {
    pub base_url: String,
    pub key: String,
    pub secret: String,
    pub advertiser_id: String,
}

impl AutoTraderConfig {
    /// Reads AUTOTRADER_KEY, AUTOTRADER_SECRET and AUTOTRADER_ADVERTISER_ID,
    /// with AUTOTRADER_BASE_URL optionally overriding the sandbox default.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: env_opt("AUTOTRADER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            key: env_req("AUTOTRADER_KEY")?,
            secret: env_req("AUTOTRADER_SECRET")?,
            advertiser_id: env_req("AUTOTRADER_ADVERTISER_ID")?,
        })
    }
}

pub struct AutoTraderProvider {
    config: AutoTraderConfig,
    http: Client,
}

impl AutoTraderProvider {
    pub fn new(config: AutoTraderConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("forecourt/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn advertiser_id(&self) -> &str {
        &self.config.advertiser_id
    }
}

#[async_trait]
impl StockProvider for AutoTraderProvider {
    async fn authenticate(&self) -> Result<String> {
        let url = format!("{}/authenticate", self.config.base_url);
        let resp = self
            .http
            .post(&url)
            .form(&[("key", self.config.key.as_str()), ("secret", self.config.secret.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Auth(format!(
                "token endpoint returned {}: {}",
                status,
                truncate_for_log(&body, 2000)
            )));
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("unparseable token response: {e}")))?;
        match payload.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(Error::Auth("token response missing access_token".into())),
        }
    }

    async fn fetch_page(&self, token: &str, page: u32, page_size: u32) -> Result<StockPage> {
        let url = format!("{}/stock", self.config.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("advertiserId", self.config.advertiser_id.as_str()),
                ("page", &page.to_string()),
                ("pageSize", &page_size.to_string()),
                ("features", "true"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Provider {
                status: status.as_u16(),
                message: truncate_for_log(&body, 2000),
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| Error::Provider {
            status: status.as_u16(),
            message: format!("unparseable stock page: {e}"),
        })?;
        let parsed = parse_stock_page(&payload);
        debug!(page, results = parsed.results.len(), "fetched stock page");
        Ok(parsed)
    }
}

/// Pulls `results` and the pagination block out of a raw stock page payload.
/// Missing fields degrade to empty/None rather than failing the sync.
fn parse_stock_page(payload: &Value) -> StockPage {
    let results = payload
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let page = payload.get("page");
    let total_pages = page
        .and_then(|p| p.get("totalPages"))
        .and_then(Value::as_u64)
        .map(|n| n as u32);
    let total_results = page
        .and_then(|p| p.get("totalResults"))
        .and_then(Value::as_u64);
    StockPage {
        results,
        total_pages,
        total_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> AutoTraderConfig {
        AutoTraderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            key: "k".into(),
            secret: "s".into(),
            advertiser_id: "10012345".into(),
        }
    }

    #[test]
    fn provider_initializes() {
        let provider = AutoTraderProvider::new(test_config()).unwrap();
        assert_eq!(provider.advertiser_id(), "10012345");
    }

    #[test]
    fn parses_full_page() {
        let payload = json!({
            "results": [
                {"vehicle": {"registration": "AB12CDE"}},
                {"vehicle": {"registration": "XY34ZZZ"}}
            ],
            "page": {"number": 1, "totalPages": 3, "totalResults": 250}
        });
        let page = parse_stock_page(&payload);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.total_pages, Some(3));
        assert_eq!(page.total_results, Some(250));
    }

    #[test]
    fn tolerates_missing_pagination() {
        let payload = json!({"results": []});
        let page = parse_stock_page(&payload);
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, None);
        assert_eq!(page.total_results, None);
    }

    #[tokio::test]
    #[ignore] // needs live AUTOTRADER_* credentials
    async fn live_authenticate_and_first_page() {
        let config = AutoTraderConfig::from_env().expect("env");
        let provider = AutoTraderProvider::new(config).expect("client");
        let token = provider.authenticate().await.expect("auth");
        let page = provider.fetch_page(&token, 1, 100).await.expect("page");
        println!(
            "page 1: {} results, totalPages={:?}",
            page.results.len(),
            page.total_pages
        );
    }
}
