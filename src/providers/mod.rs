//! External data providers: the stock feed (paginated, OAuth-style token)
//! and the vehicle registry used for lookup fallback.

pub mod autotrader;
pub mod ukvd;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One page of listings from the stock feed, with whatever pagination
/// metadata the feed returned.
#[derive(Debug, Clone, Default)]
pub struct StockPage {
    pub results: Vec<Value>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
}

/// Paginated stock feed. Authentication is explicit so the engine can hold
/// one token for the whole run instead of re-authenticating per page.
#[async_trait]
pub trait StockProvider: Send + Sync {
    async fn authenticate(&self) -> Result<String>;
    async fn fetch_page(&self, token: &str, page: u32, page_size: u32) -> Result<StockPage>;
}

/// Fallback registry lookup by registration mark. `Ok(None)` means the
/// registry answered but has no record; errors are transport/API failures.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn lookup(&self, registration: &str) -> Result<Option<Value>>;
}

/// Cap response bodies quoted in error messages and logs. The cut point
/// backs up to a char boundary so multi-byte bodies never panic the caller.
pub(crate) fn truncate_for_log(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut cut = max;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated {} bytes]", &body[..cut], body.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies() {
        let body = "x".repeat(3000);
        let out = truncate_for_log(&body, 2000);
        assert!(out.starts_with(&"x".repeat(2000)));
        assert!(out.contains("truncated 1000 bytes"));
    }

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(truncate_for_log("oops", 2000), "oops");
    }

    #[test]
    fn cut_backs_up_to_char_boundary() {
        // A euro sign straddling the cut point must not split mid-character.
        let mut body = "x".repeat(1999);
        body.push('€');
        body.push_str(&"y".repeat(100));
        let out = truncate_for_log(&body, 2000);
        assert!(out.starts_with(&"x".repeat(1999)));
        assert!(!out.contains('€'));
        assert!(out.contains("truncated"));
    }
}
