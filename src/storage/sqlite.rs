//! SQLite storage for the keyword registry and rank history.
//!
//! Tables:
//! - `categories`, `products`, `keywords` - registry populated from a seed file
//! - `ranks` - UPSERT on `(keyword_id, date)`

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{AppError, Result};
use crate::models::{Keyword, KeywordHistory, KeywordId, Priority, RankObservation, Seed};
use crate::storage::{KeywordRegistry, RankStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS products (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    UNIQUE (category_id, name)
);

CREATE TABLE IF NOT EXISTS keywords (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    query      TEXT NOT NULL,
    priority   INTEGER NOT NULL DEFAULT 2,
    target_url TEXT,
    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    UNIQUE (product_id, query)
);

CREATE TABLE IF NOT EXISTS ranks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword_id  INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
    date        TEXT NOT NULL,
    position    REAL NOT NULL,
    impressions INTEGER NOT NULL,
    clicks      INTEGER NOT NULL,
    ctr         REAL NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (keyword_id, date)
);

CREATE INDEX IF NOT EXISTS idx_ranks_date ON ranks(date);
"#;

/// Counts of seed entries written by an import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub keywords: usize,
}

/// SQLite-backed keyword registry and rank store.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        log::debug!("Opened SQLite database at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::storage("SQLite connection lock poisoned"))
    }

    /// Import a seed file into the registry.
    ///
    /// Categories and products are matched by name; keywords by
    /// `(product, query)`, updating priority and target URL in place.
    pub fn import_seed(&self, seed: &Seed) -> Result<SeedSummary> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut summary = SeedSummary::default();

        for category in &seed.categories {
            tx.execute(
                "INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                params![category.name.trim()],
            )?;
            let category_id: i64 = tx.query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![category.name.trim()],
                |row| row.get(0),
            )?;
            summary.categories += 1;

            for product in &category.products {
                tx.execute(
                    "INSERT INTO products (name, category_id) VALUES (?1, ?2)
                     ON CONFLICT(category_id, name) DO NOTHING",
                    params![product.name.trim(), category_id],
                )?;
                let product_id: i64 = tx.query_row(
                    "SELECT id FROM products WHERE category_id = ?1 AND name = ?2",
                    params![category_id, product.name.trim()],
                    |row| row.get(0),
                )?;
                summary.products += 1;

                for keyword in &product.keywords {
                    tx.execute(
                        "INSERT INTO keywords (query, priority, target_url, product_id)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(product_id, query) DO UPDATE SET
                            priority = excluded.priority,
                            target_url = excluded.target_url",
                        params![
                            keyword.query.trim(),
                            u8::from(keyword.priority),
                            keyword.target_url,
                            product_id
                        ],
                    )?;
                    summary.keywords += 1;
                }
            }
        }

        tx.commit()?;
        log::info!(
            "Imported seed: {} categories, {} products, {} keywords",
            summary.categories,
            summary.products,
            summary.keywords
        );
        Ok(summary)
    }

    fn keywords_ordered(conn: &Connection) -> Result<Vec<Keyword>> {
        let mut stmt = conn.prepare(
            "SELECT id, query, priority, target_url, product_id
             FROM keywords ORDER BY priority ASC, query ASC",
        )?;
        let keywords = stmt
            .query_map([], keyword_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keywords)
    }
}

fn keyword_from_row(row: &Row<'_>) -> rusqlite::Result<Keyword> {
    let priority: u8 = row.get(2)?;
    Ok(Keyword {
        id: KeywordId(row.get(0)?),
        query: row.get(1)?,
        priority: Priority::try_from(priority).unwrap_or_default(),
        target_url: row.get(3)?,
        product_id: row.get(4)?,
    })
}

fn rank_from_row(row: &Row<'_>) -> rusqlite::Result<RankObservation> {
    let impressions: i64 = row.get(3)?;
    let clicks: i64 = row.get(4)?;
    Ok(RankObservation {
        keyword_id: KeywordId(row.get(0)?),
        date: row.get(1)?,
        position: row.get(2)?,
        impressions: impressions.max(0) as u64,
        clicks: clicks.max(0) as u64,
        ctr: row.get(5)?,
    })
}

fn count_as_sql(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl KeywordRegistry for SqliteStorage {
    async fn all_keywords(&self) -> Result<Vec<Keyword>> {
        let conn = self.conn()?;
        Self::keywords_ordered(&conn)
    }
}

#[async_trait]
impl RankStore for SqliteStorage {
    async fn upsert_rank(&self, observation: &RankObservation) -> Result<()> {
        let now = Utc::now();
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO ranks (
                keyword_id, date, position, impressions, clicks, ctr, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(keyword_id, date) DO UPDATE SET
                position = excluded.position,
                impressions = excluded.impressions,
                clicks = excluded.clicks,
                ctr = excluded.ctr,
                updated_at = excluded.updated_at
            "#,
            params![
                observation.keyword_id.0,
                observation.date,
                observation.position,
                count_as_sql(observation.impressions),
                count_as_sql(observation.clicks),
                observation.ctr,
                now,
            ],
        )?;
        Ok(())
    }

    async fn find_rank(
        &self,
        keyword_id: KeywordId,
        date: NaiveDate,
    ) -> Result<Option<RankObservation>> {
        let conn = self.conn()?;
        let rank = conn
            .query_row(
                "SELECT keyword_id, date, position, impressions, clicks, ctr
                 FROM ranks WHERE keyword_id = ?1 AND date = ?2",
                params![keyword_id.0, date],
                rank_from_row,
            )
            .optional()?;
        Ok(rank)
    }

    async fn count_ranks(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ranks", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    async fn history_since(&self, since: NaiveDate) -> Result<Vec<KeywordHistory>> {
        let conn = self.conn()?;
        let keywords = Self::keywords_ordered(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT keyword_id, date, position, impressions, clicks, ctr
             FROM ranks WHERE date >= ?1 ORDER BY keyword_id ASC, date ASC",
        )?;
        let mut by_keyword: HashMap<KeywordId, Vec<RankObservation>> = HashMap::new();
        for rank in stmt.query_map(params![since], rank_from_row)? {
            let rank = rank?;
            by_keyword.entry(rank.keyword_id).or_default().push(rank);
        }

        Ok(keywords
            .into_iter()
            .map(|keyword| KeywordHistory {
                ranks: by_keyword.remove(&keyword.id).unwrap_or_default(),
                keyword,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeedCategory, SeedKeyword, SeedProduct};
    use tempfile::TempDir;

    fn seed() -> Seed {
        Seed {
            categories: vec![SeedCategory {
                name: "Footwear".into(),
                products: vec![SeedProduct {
                    name: "Trail Runner X".into(),
                    keywords: vec![
                        SeedKeyword {
                            query: "trail shoes".into(),
                            priority: Priority::Low,
                            target_url: None,
                        },
                        SeedKeyword {
                            query: "Running Shoes".into(),
                            priority: Priority::High,
                            target_url: Some("https://example.com/x".into()),
                        },
                    ],
                }],
            }],
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn observation(keyword_id: KeywordId, date: NaiveDate, position: f64) -> RankObservation {
        RankObservation {
            keyword_id,
            date,
            position,
            impressions: 100,
            clicks: 5,
            ctr: 0.05,
        }
    }

    #[tokio::test]
    async fn test_import_seed_is_idempotent() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.import_seed(&seed()).unwrap();
        storage.import_seed(&seed()).unwrap();

        let keywords = storage.all_keywords().await.unwrap();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].query, "Running Shoes");
        assert_eq!(keywords[0].priority, Priority::High);
        assert_eq!(keywords[0].target_url.as_deref(), Some("https://example.com/x"));
        assert_eq!(keywords[1].priority, Priority::Low);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_key() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.import_seed(&seed()).unwrap();
        let id = storage.all_keywords().await.unwrap()[0].id;

        storage.upsert_rank(&observation(id, day(1), 5.0)).await.unwrap();
        storage.upsert_rank(&observation(id, day(1), 3.0)).await.unwrap();

        assert_eq!(storage.count_ranks().await.unwrap(), 1);
        let stored = storage.find_rank(id, day(1)).await.unwrap().unwrap();
        assert_eq!(stored.position, 3.0);
    }

    #[tokio::test]
    async fn test_distinct_dates_are_distinct_rows() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.import_seed(&seed()).unwrap();
        let id = storage.all_keywords().await.unwrap()[0].id;

        storage.upsert_rank(&observation(id, day(1), 5.0)).await.unwrap();
        storage.upsert_rank(&observation(id, day(2), 4.0)).await.unwrap();

        assert_eq!(storage.count_ranks().await.unwrap(), 2);
        assert!(storage.find_rank(id, day(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_since_filters_and_orders() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.import_seed(&seed()).unwrap();
        let keywords = storage.all_keywords().await.unwrap();
        let (high, low) = (keywords[0].id, keywords[1].id);

        storage.upsert_rank(&observation(high, day(3), 2.0)).await.unwrap();
        storage.upsert_rank(&observation(high, day(1), 4.0)).await.unwrap();
        storage.upsert_rank(&observation(high, day(2), 3.0)).await.unwrap();

        let history = storage.history_since(day(2)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].keyword.id, high);
        let dates: Vec<_> = history[0].ranks.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2), day(3)]);
        assert_eq!(history[1].keyword.id, low);
        assert!(history[1].ranks.is_empty());
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/ranks.db");

        let storage = SqliteStorage::open(&path).unwrap();
        storage.import_seed(&seed()).unwrap();
        let id = storage.all_keywords().await.unwrap()[0].id;
        storage.upsert_rank(&observation(id, day(1), 7.5)).await.unwrap();
        drop(storage);

        let reopened = SqliteStorage::open(&path).unwrap();
        let stored = reopened.find_rank(id, day(1)).await.unwrap().unwrap();
        assert_eq!(stored.position, 7.5);
    }
}
