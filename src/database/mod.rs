use std::collections::HashSet;
use std::str::FromStr;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::PriceHistory;

/// Outcome of adding a watchlist entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAdd {
    Added,
    AlreadyPresent,
}

/// Outcome of removing a watchlist entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchRemove {
    Removed,
    NotFound,
}

/// All four persisted resources live in one SQLite file: the notified-id
/// set, the watchlist, the price history and the digest last-fired date.
/// Reads fall back to empty defaults when the store is unreadable so a
/// corrupt file costs duplicate notifications, never availability.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create database file if it doesn't exist
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePool::connect(database_url).await?;

        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    /// Every deal id ever notified, or the empty set when the store
    /// cannot be read.
    pub async fn notified_ids(&self) -> HashSet<String> {
        match self.try_notified_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Dedup store unreadable, starting from empty set: {e}");
                HashSet::new()
            }
        }
    }

    async fn try_notified_ids(&self) -> Result<HashSet<String>, StoreError> {
        let rows = sqlx::query("SELECT id FROM notified_deals")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("id"))
            .collect())
    }

    pub async fn mark_notified(&self, deal_ids: &[String]) -> Result<(), StoreError> {
        for deal_id in deal_ids {
            sqlx::query(
                r"
                INSERT OR IGNORE INTO notified_deals (id, notified_at)
                VALUES (?, ?)
                ",
            )
            .bind(deal_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub async fn watch_add(&self, entry: &str) -> Result<WatchAdd, StoreError> {
        let stored = entry.trim().to_lowercase();
        let result = sqlx::query("INSERT OR IGNORE INTO watchlist (entry) VALUES (?)")
            .bind(&stored)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Ok(WatchAdd::AlreadyPresent)
        } else {
            Ok(WatchAdd::Added)
        }
    }

    pub async fn watch_remove(&self, entry: &str) -> Result<WatchRemove, StoreError> {
        let stored = entry.trim().to_lowercase();
        let result = sqlx::query("DELETE FROM watchlist WHERE entry = ?")
            .bind(&stored)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Ok(WatchRemove::NotFound)
        } else {
            Ok(WatchRemove::Removed)
        }
    }

    pub async fn watch_clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM watchlist")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Watchlist entries in insertion order, or empty on store failure.
    pub async fn watch_list(&self) -> Vec<String> {
        match self.try_watch_list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Watchlist store unreadable, using empty list: {e}");
                Vec::new()
            }
        }
    }

    async fn try_watch_list(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT entry FROM watchlist ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("entry"))
            .collect())
    }

    /// Full observed-price history, or an empty history on store failure.
    pub async fn price_history(&self) -> PriceHistory {
        match self.try_price_history().await {
            Ok(history) => history,
            Err(e) => {
                warn!("Price history unreadable, starting fresh: {e}");
                PriceHistory::new()
            }
        }
    }

    async fn try_price_history(&self) -> Result<PriceHistory, StoreError> {
        let rows = sqlx::query("SELECT deal_id, price FROM price_history ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut parsed = Vec::with_capacity(rows.len());
        for row in rows {
            let deal_id = row.get::<String, _>("deal_id");
            let raw = row.get::<String, _>("price");
            match Decimal::from_str(&raw) {
                Ok(price) => parsed.push((deal_id, price)),
                Err(_) => warn!("Skipping unparseable price {raw:?} for {deal_id}"),
            }
        }

        Ok(PriceHistory::from_rows(parsed))
    }

    pub async fn record_prices(
        &self,
        observations: &[(String, Decimal)],
    ) -> Result<(), StoreError> {
        for (deal_id, price) in observations {
            sqlx::query(
                r"
                INSERT INTO price_history (deal_id, price, observed_at)
                VALUES (?, ?, ?)
                ",
            )
            .bind(deal_id)
            .bind(price.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Local calendar date the digest last fired, or None on first run or
    /// store failure.
    pub async fn digest_last_fired(&self) -> Option<NaiveDate> {
        match self.try_digest_last_fired().await {
            Ok(date) => date,
            Err(e) => {
                warn!("Digest state unreadable, treating as never fired: {e}");
                None
            }
        }
    }

    async fn try_digest_last_fired(&self) -> Result<Option<NaiveDate>, StoreError> {
        let row = sqlx::query("SELECT last_fired FROM digest_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|row| {
            let raw = row.get::<String, _>("last_fired");
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()
        }))
    }

    pub async fn set_digest_last_fired(&self, date: NaiveDate) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO digest_state (id, last_fired)
            VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET last_fired = excluded.last_fired
            ",
        )
        .bind(date.format("%Y-%m-%d").to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    async fn temp_database() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite:{}", dir.path().join("deals.db").display());
        let database = Database::new(&url).await.expect("database");
        (dir, database)
    }

    #[tokio::test]
    async fn watchlist_add_is_case_insensitive_and_idempotent() {
        let (_dir, db) = temp_database().await;

        assert_eq!(db.watch_add("Hades").await.unwrap(), WatchAdd::Added);
        assert_eq!(
            db.watch_add("hades").await.unwrap(),
            WatchAdd::AlreadyPresent
        );
        assert_eq!(db.watch_list().await, vec!["hades".to_string()]);
    }

    #[tokio::test]
    async fn watchlist_preserves_insertion_order() {
        let (_dir, db) = temp_database().await;

        db.watch_add("zelda").await.unwrap();
        db.watch_add("alpha").await.unwrap();
        db.watch_add("mario").await.unwrap();

        assert_eq!(db.watch_list().await, vec!["zelda", "alpha", "mario"]);
    }

    #[tokio::test]
    async fn watchlist_remove_and_clear() {
        let (_dir, db) = temp_database().await;

        assert_eq!(
            db.watch_remove("ghost").await.unwrap(),
            WatchRemove::NotFound
        );

        db.watch_add("hades").await.unwrap();
        db.watch_add("celeste").await.unwrap();
        assert_eq!(
            db.watch_remove("HADES").await.unwrap(),
            WatchRemove::Removed
        );

        db.watch_clear().await.unwrap();
        assert!(db.watch_list().await.is_empty());
    }

    #[tokio::test]
    async fn dedup_set_roundtrips_and_ignores_duplicates() {
        let (_dir, db) = temp_database().await;

        db.mark_notified(&["epic_free_Alpha".to_string(), "steam_discount_570".to_string()])
            .await
            .unwrap();
        db.mark_notified(&["epic_free_Alpha".to_string()])
            .await
            .unwrap();

        let ids = db.notified_ids().await;
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("epic_free_Alpha"));
        assert!(ids.contains("steam_discount_570"));
    }

    #[tokio::test]
    async fn price_history_running_minimum_survives_reload() {
        let (_dir, db) = temp_database().await;

        db.record_prices(&[
            ("steam_discount_570".to_string(), dec!(499)),
            ("steam_discount_570".to_string(), dec!(299)),
            ("steam_discount_570".to_string(), dec!(399)),
        ])
        .await
        .unwrap();

        let history = db.price_history().await;
        assert_eq!(history.minimum("steam_discount_570"), Some(dec!(299)));
    }

    #[tokio::test]
    async fn digest_date_roundtrips() {
        let (_dir, db) = temp_database().await;

        assert_eq!(db.digest_last_fired().await, None);

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        db.set_digest_last_fired(date).await.unwrap();
        assert_eq!(db.digest_last_fired().await, Some(date));
    }

    #[tokio::test]
    async fn unreadable_resources_fall_back_to_empty_defaults() {
        let (_dir, db) = temp_database().await;
        db.watch_add("hades").await.unwrap();

        sqlx::query("DROP TABLE watchlist")
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("DROP TABLE notified_deals")
            .execute(&db.pool)
            .await
            .unwrap();

        assert!(db.watch_list().await.is_empty());
        assert!(db.notified_ids().await.is_empty());
    }
}
