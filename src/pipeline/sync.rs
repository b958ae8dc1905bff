// src/pipeline/sync.rs

//! Rank sync pipeline.
//!
//! One sync = credential check, site resolution, window, keyword lookup,
//! paginated fetch, reconcile. Shared by the CLI and the HTTP routes.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{DateRange, RANK_DIMENSIONS, SyncConfig};
use crate::pipeline::window::{SyncMode, WindowPolicy};
use crate::services::{KeywordLookup, ReconcileReport, SearchAnalytics, SourceFactory, reconcile};
use crate::storage::{CredentialStore, KeywordRegistry, RankStore};
use crate::utils::log;

/// Result of a sync that reached the reconcile stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub site_url: String,
    pub mode: SyncMode,
    pub range: DateRange,
    pub reconcile: ReconcileReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Nothing to match against; no analytics were fetched.
    NoKeywords { site_url: String, range: DateRange },
}

/// Orchestrates a sync from stored credential to upserted ranks.
pub struct RankSync {
    credentials: Arc<dyn CredentialStore>,
    keywords: Arc<dyn KeywordRegistry>,
    ranks: Arc<dyn RankStore>,
    sources: Arc<dyn SourceFactory>,
    policy: WindowPolicy,
    default_months: u32,
    max_months: u32,
}

impl RankSync {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        keywords: Arc<dyn KeywordRegistry>,
        ranks: Arc<dyn RankStore>,
        sources: Arc<dyn SourceFactory>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            credentials,
            keywords,
            ranks,
            sources,
            policy: WindowPolicy::from_config(config),
            default_months: config.backfill_months,
            max_months: config.max_backfill_months,
        }
    }

    /// Backfill length for a request; `None` or `0` means the default.
    pub fn resolve_months(&self, requested: Option<u32>) -> Result<u32> {
        match requested {
            None | Some(0) => Ok(self.default_months),
            Some(months) if months > self.max_months => Err(AppError::validation(format!(
                "months must be at most {} (got {})",
                self.max_months, months
            ))),
            Some(months) => Ok(months),
        }
    }

    /// Sync `months` back from the last finalized day.
    ///
    /// Without `site_url` the first site the credential can read is used.
    pub async fn backfill(
        &self,
        site_url: Option<&str>,
        months: Option<u32>,
        today: NaiveDate,
    ) -> Result<SyncOutcome> {
        let source = self.connect().await?;
        let months = self.resolve_months(months)?;
        self.run(source.as_ref(), SyncMode::Backfill { months }, site_url, today)
            .await
    }

    /// Sync the single most recently finalized day.
    pub async fn incremental(
        &self,
        site_url: Option<&str>,
        today: NaiveDate,
    ) -> Result<SyncOutcome> {
        let source = self.connect().await?;
        self.run(source.as_ref(), SyncMode::Incremental, site_url, today)
            .await
    }

    async fn connect(&self) -> Result<Arc<dyn SearchAnalytics>> {
        let credential = self
            .credentials
            .load()
            .await?
            .ok_or(AppError::NotAuthenticated)?;
        Ok(self.sources.connect(credential))
    }

    async fn run(
        &self,
        source: &dyn SearchAnalytics,
        mode: SyncMode,
        site_url: Option<&str>,
        today: NaiveDate,
    ) -> Result<SyncOutcome> {
        log::header(match mode {
            SyncMode::Backfill { .. } => "Rank backfill",
            SyncMode::Incremental => "Rank incremental sync",
        });

        log::step(1, 4, "Resolving site");
        let site_url = resolve_site(source, site_url).await?;
        let range = self.policy.window(mode, today)?;
        log::sub_item(&format!("{site_url} ({range})"));

        log::step(2, 4, "Loading keywords");
        let keywords = self.keywords.all_keywords().await?;
        if keywords.is_empty() {
            log::warn("No keywords registered; skipping fetch");
            return Ok(SyncOutcome::NoKeywords { site_url, range });
        }
        let lookup = KeywordLookup::build(&keywords);
        log::sub_item(&format!("{} keywords", lookup.len()));

        log::step(3, 4, "Fetching search analytics");
        let rows = source
            .fetch_analytics(&site_url, range, &RANK_DIMENSIONS)
            .await?;
        log::sub_item(&format!("{} rows", rows.len()));

        log::step(4, 4, "Reconciling ranks");
        let report = reconcile(&rows, &lookup, self.ranks.as_ref()).await?;

        log::summary(
            "Sync complete",
            &[
                ("site", site_url.clone()),
                ("range", range.to_string()),
                ("rows", report.total_rows.to_string()),
                ("matched", report.matched.to_string()),
                ("written", report.written.to_string()),
                ("invalid", report.invalid_rows.to_string()),
            ],
        );

        Ok(SyncOutcome::Completed(SyncReport {
            site_url,
            mode,
            range,
            reconcile: report,
        }))
    }
}

/// Requested site, or the first one the source lists.
async fn resolve_site(source: &dyn SearchAnalytics, requested: Option<&str>) -> Result<String> {
    if let Some(site) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(site.to_string());
    }

    source
        .list_sites()
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NoSiteConfigured)
}
