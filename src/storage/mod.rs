//! Storage abstractions for credentials, keywords, and rank history.
//!
//! - `CredentialStore`: single active OAuth credential (`local::FileCredentialStore`)
//! - `KeywordRegistry`: read-only keyword lookup (`sqlite::SqliteStorage`)
//! - `RankStore`: idempotent rank time series (`sqlite::SqliteStorage`)

pub mod local;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Credential, Keyword, KeywordHistory, KeywordId, RankObservation};

// Re-export for convenience
pub use local::FileCredentialStore;
pub use sqlite::SqliteStorage;

/// Holder of the single current OAuth credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Replace the stored credential.
    ///
    /// Readers observe either the previous credential or the new one, never
    /// an empty slot.
    async fn save(&self, credential: Credential) -> Result<()>;

    /// The current credential, or `None` if none was ever saved.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Existence check only; says nothing about token freshness.
    async fn is_authenticated(&self) -> bool;
}

/// Read-only view of registered keywords.
#[async_trait]
pub trait KeywordRegistry: Send + Sync {
    async fn all_keywords(&self) -> Result<Vec<Keyword>>;
}

/// Persistence for rank observations keyed by `(keyword, date)`.
#[async_trait]
pub trait RankStore: Send + Sync {
    /// Insert the observation, or overwrite the measures of the existing one
    /// for the same `(keyword_id, date)`.
    async fn upsert_rank(&self, observation: &RankObservation) -> Result<()>;

    async fn find_rank(
        &self,
        keyword_id: KeywordId,
        date: NaiveDate,
    ) -> Result<Option<RankObservation>>;

    async fn count_ranks(&self) -> Result<usize>;

    /// Every keyword with its observations on or after `since`.
    ///
    /// Keywords are ordered by priority then query, observations by date.
    async fn history_since(&self, since: NaiveDate) -> Result<Vec<KeywordHistory>>;
}
