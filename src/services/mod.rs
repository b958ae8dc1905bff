//! Service layer for the rank tracker.
//!
//! This module contains the business logic for:
//! - Search analytics access with pagination (`SearchAnalytics`)
//! - OAuth consent, code exchange and token refresh (`OAuthProvider`)
//! - Keyword matching and rank upserts (`reconcile`)

pub mod analytics;
pub mod oauth;
pub mod reconcile;

pub use analytics::{
    DEFAULT_PAGE_SIZE, SearchAnalytics, SearchConsoleClient, SearchConsoleConnector, Session,
    SourceFactory,
};
pub use oauth::{GoogleOAuth, OAuthProvider};
pub use reconcile::{KeywordLookup, ReconcileReport, reconcile};
