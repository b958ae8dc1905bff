// src/models/mod.rs

//! Domain models for the rank tracker.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod analytics;
mod config;
mod credential;
mod keyword;
mod rank;
mod seed;

// Re-export all public types
pub use analytics::{
    AnalyticsQuery, AnalyticsRow, DATE_FORMAT, DateRange, Dimension, RANK_DIMENSIONS, parse_date,
};
pub use config::{
    Config, CredentialsConfig, DatabaseConfig, GscConfig, LoggingConfig, ServerConfig, SyncConfig,
};
pub use credential::Credential;
pub use keyword::{Keyword, KeywordId, Priority, normalize_query};
pub use rank::RankObservation;
pub use seed::{Seed, SeedCategory, SeedKeyword, SeedProduct};

/// A keyword together with its stored rank history.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordHistory {
    #[serde(flatten)]
    pub keyword: Keyword,
    pub ranks: Vec<RankObservation>,
}
