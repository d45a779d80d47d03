//! Dealer-managed overlay keyed by normalized registration. Survives cache
//! refreshes because it lives outside the stock snapshot row.

use crate::error::Result;
use crate::store::db::Db;
use sqlx::Row;
use std::collections::HashMap;

#[derive(Clone)]
pub struct MetadataStore {
    db: Db,
}

impl MetadataStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert or update the reserve link for a registration. The caller is
    /// expected to pass an already-normalized registration.
    pub async fn upsert(&self, registration: &str, reserve_link: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO vehicle_metadata (registration, reserve_link)
             VALUES ($1, $2)
             ON CONFLICT (registration)
             DO UPDATE SET reserve_link = EXCLUDED.reserve_link, updated_at = now()",
        )
        .bind(registration)
        .bind(reserve_link)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    /// All reserve links, keyed by normalized registration.
    pub async fn reserve_links(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query(
            "SELECT registration, reserve_link FROM vehicle_metadata
             WHERE reserve_link IS NOT NULL",
        )
        .fetch_all(&self.db.pool)
        .await?;

        let mut links = HashMap::with_capacity(rows.len());
        for row in rows {
            let registration: String = row.get("registration");
            let reserve_link: String = row.get("reserve_link");
            links.insert(registration, reserve_link);
        }
        Ok(links)
    }
}
