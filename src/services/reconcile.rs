// src/services/reconcile.rs

//! Rank reconciler.
//!
//! Resolves analytics rows (dimensions `[query, date]`) to registered keywords
//! and upserts one rank observation per matched row.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::models::{AnalyticsRow, Keyword, KeywordId, RankObservation, normalize_query, parse_date};
use crate::storage::RankStore;

/// Lower-cased query to keyword id, rebuilt for every sync.
#[derive(Debug, Default)]
pub struct KeywordLookup {
    by_query: HashMap<String, KeywordId>,
}

impl KeywordLookup {
    /// Build the lookup from the full registered keyword set.
    ///
    /// Keywords that collide case-insensitively resolve to the last one given.
    pub fn build(keywords: &[Keyword]) -> Self {
        let mut by_query = HashMap::with_capacity(keywords.len());
        for keyword in keywords {
            if let Some(previous) = by_query.insert(keyword.match_key(), keyword.id) {
                log::warn!(
                    "Keyword '{}' shadows keyword {} with the same query",
                    keyword.query,
                    previous
                );
            }
        }
        Self { by_query }
    }

    /// Keyword registered for `query`, ignoring case.
    pub fn resolve(&self, query: &str) -> Option<KeywordId> {
        if query.is_empty() {
            return None;
        }
        self.by_query.get(&normalize_query(query)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_query.is_empty()
    }
}

/// Counts from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub total_rows: usize,
    pub matched: usize,
    pub written: usize,
    pub unmatched: usize,
    /// Matched rows skipped because their date key was missing or malformed
    pub invalid_rows: usize,
}

/// Upsert a rank observation for every row whose query is registered.
///
/// Rows are processed in order; a storage failure aborts the pass and leaves
/// earlier writes in place.
pub async fn reconcile(
    rows: &[AnalyticsRow],
    lookup: &KeywordLookup,
    ranks: &dyn RankStore,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport {
        total_rows: rows.len(),
        ..ReconcileReport::default()
    };

    for row in rows {
        let Some(keyword_id) = row.key(0).and_then(|query| lookup.resolve(query)) else {
            report.unmatched += 1;
            continue;
        };

        let date = match row.key(1).map(parse_date) {
            Some(Ok(date)) => date,
            Some(Err(e)) => {
                log::debug!("Skipping row for keyword {}: {}", keyword_id, e);
                report.invalid_rows += 1;
                continue;
            }
            None => {
                log::debug!("Skipping row for keyword {}: no date key", keyword_id);
                report.invalid_rows += 1;
                continue;
            }
        };

        report.matched += 1;
        ranks
            .upsert_rank(&RankObservation::from_row(keyword_id, date, row))
            .await?;
        report.written += 1;
    }

    log::info!(
        "Reconciled {} rows: {} matched, {} written, {} unmatched, {} invalid",
        report.total_rows,
        report.matched,
        report.written,
        report.unmatched,
        report.invalid_rows
    );
    Ok(report)
}
