//! Round persistence on SQLite.
//!
//! The collector writes rounds in here; the API reads bounded,
//! most-recent-first windows back out and hands them to the analytics
//! engine. Inserts are idempotent on the provider round id, so replayed
//! feed messages never duplicate rows.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::types::{Round, TrackerError};

const SELECT_COLUMNS: &str =
    "SELECT round_id, multiplier, coordinate_x, coordinate_y, hash, created_at FROM rounds";

/// Shared handle to the rounds database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoundStore {
    pool: SqlitePool,
}

impl RoundStore {
    /// Open (or create) the database at `url` and prepare the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {url}"))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Single-connection in-memory store for tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                round_id TEXT UNIQUE NOT NULL,
                multiplier REAL NOT NULL,
                coordinate_x REAL,
                coordinate_y REAL,
                hash TEXT,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create rounds table")?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_created ON rounds(created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_multiplier ON rounds(multiplier)",
            "CREATE INDEX IF NOT EXISTS idx_round_id ON rounds(round_id)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create index")?;
        }

        info!("Database schema ready");
        Ok(())
    }

    /// Insert a round, ignoring duplicates by round id.
    /// Returns true when a new row was written.
    pub async fn insert_round(
        &self,
        round_id: &str,
        multiplier: f64,
        coordinate_x: Option<f64>,
        coordinate_y: Option<f64>,
        hash: Option<&str>,
    ) -> Result<bool> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(TrackerError::InvalidRound(format!(
                "multiplier must be positive, got {multiplier}"
            ))
            .into());
        }

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO rounds
                (round_id, multiplier, coordinate_x, coordinate_y, hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(round_id)
        .bind(multiplier)
        .bind(coordinate_x)
        .bind(coordinate_y)
        .bind(hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to insert round")?;

        let inserted = result.rows_affected() == 1;
        if inserted {
            debug!(round_id, multiplier, "Round stored");
        } else {
            debug!(round_id, "Duplicate round ignored");
        }
        Ok(inserted)
    }

    /// Most-recent-first window, optionally bounded by an hour cutoff
    /// and a row limit.
    pub async fn recent_rounds(
        &self,
        hours: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Round>> {
        let mut sql = String::from(SELECT_COLUMNS);
        if hours.is_some() {
            sql.push_str(" WHERE created_at >= ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_as::<_, Round>(&sql);
        if let Some(h) = hours {
            query = query.bind(Utc::now() - Duration::hours(h));
        }
        if let Some(l) = limit {
            query = query.bind(l);
        }

        let rounds = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch rounds")?;
        Ok(rounds)
    }

    /// Paginated most-recent-first listing plus the total row count.
    pub async fn paged_rounds(&self, limit: i64, offset: i64) -> Result<(Vec<Round>, i64)> {
        let total = self.count_rounds().await?;
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
        let rounds = sqlx::query_as::<_, Round>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch rounds page")?;
        Ok((rounds, total))
    }

    pub async fn count_rounds(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM rounds")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count rounds")?;
        Ok(row.get("n"))
    }

    /// Timestamp of the newest stored round, if any.
    pub async fn last_update(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(created_at) AS latest FROM rounds")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read last update")?;
        Ok(row.get("latest"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Insert a round with an explicit timestamp, bypassing the public API.
    async fn insert_at(store: &RoundStore, round_id: &str, multiplier: f64, at: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO rounds (round_id, multiplier, created_at) VALUES (?, ?, ?)",
        )
        .bind(round_id)
        .bind(multiplier)
        .bind(at)
        .execute(&store.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_fetch_roundtrip() {
        let store = RoundStore::in_memory().await.unwrap();
        let inserted = store
            .insert_round("r-001", 2.45, Some(10.5), Some(20.5), Some("abc123"))
            .await
            .unwrap();
        assert!(inserted);

        let rounds = store.recent_rounds(None, None).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_id, "r-001");
        assert!((rounds[0].multiplier - 2.45).abs() < 1e-10);
        assert_eq!(rounds[0].coordinate_x, Some(10.5));
        assert_eq!(rounds[0].hash.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_duplicate_round_id_ignored() {
        let store = RoundStore::in_memory().await.unwrap();
        assert!(store.insert_round("r-001", 2.0, None, None, None).await.unwrap());
        assert!(!store.insert_round("r-001", 3.0, None, None, None).await.unwrap());

        let rounds = store.recent_rounds(None, None).await.unwrap();
        assert_eq!(rounds.len(), 1);
        // First write wins
        assert!((rounds[0].multiplier - 2.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_non_positive_multiplier_rejected() {
        let store = RoundStore::in_memory().await.unwrap();
        assert!(store.insert_round("r-001", 0.0, None, None, None).await.is_err());
        assert!(store.insert_round("r-002", -2.5, None, None, None).await.is_err());
        assert_eq!(store.count_rounds().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recent_rounds_most_recent_first() {
        let store = RoundStore::in_memory().await.unwrap();
        let base = Utc::now();
        insert_at(&store, "old", 1.1, base - Duration::hours(2)).await;
        insert_at(&store, "newer", 2.2, base - Duration::hours(1)).await;
        insert_at(&store, "newest", 3.3, base).await;

        let rounds = store.recent_rounds(None, None).await.unwrap();
        let ids: Vec<&str> = rounds.iter().map(|r| r.round_id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "newer", "old"]);
    }

    #[tokio::test]
    async fn test_recent_rounds_limit() {
        let store = RoundStore::in_memory().await.unwrap();
        for i in 0..5 {
            store
                .insert_round(&format!("r-{i}"), 2.0, None, None, None)
                .await
                .unwrap();
        }
        let rounds = store.recent_rounds(None, Some(3)).await.unwrap();
        assert_eq!(rounds.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_rounds_hour_cutoff() {
        let store = RoundStore::in_memory().await.unwrap();
        let base = Utc::now();
        insert_at(&store, "stale", 1.5, base - Duration::hours(30)).await;
        insert_at(&store, "fresh", 2.5, base - Duration::minutes(10)).await;

        let rounds = store.recent_rounds(Some(24), None).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_id, "fresh");

        let all = store.recent_rounds(None, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_paged_rounds() {
        let store = RoundStore::in_memory().await.unwrap();
        let base = Utc::now();
        for i in 0..7 {
            insert_at(&store, &format!("r-{i}"), 2.0, base - Duration::minutes(i)).await;
        }

        let (page, total) = store.paged_rounds(3, 0).await.unwrap();
        assert_eq!(total, 7);
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].round_id, "r-0");

        let (page, _) = store.paged_rounds(3, 6).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].round_id, "r-6");
    }

    #[tokio::test]
    async fn test_last_update() {
        let store = RoundStore::in_memory().await.unwrap();
        assert!(store.last_update().await.unwrap().is_none());

        store.insert_round("r-001", 2.0, None, None, None).await.unwrap();
        let latest = store.last_update().await.unwrap();
        assert!(latest.is_some());
        assert!(Utc::now() - latest.unwrap() < Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_count_rounds() {
        let store = RoundStore::in_memory().await.unwrap();
        assert_eq!(store.count_rounds().await.unwrap(), 0);
        store.insert_round("a", 1.5, None, None, None).await.unwrap();
        store.insert_round("b", 2.5, None, None, None).await.unwrap();
        assert_eq!(store.count_rounds().await.unwrap(), 2);
    }
}
