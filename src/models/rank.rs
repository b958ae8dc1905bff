//! Rank observation data structure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AnalyticsRow, KeywordId};

/// One day of search performance for a registered keyword.
///
/// At most one observation exists per `(keyword_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankObservation {
    pub keyword_id: KeywordId,

    /// Calendar date of record (no time component)
    pub date: NaiveDate,

    /// Average position, 1-based, lower is better
    pub position: f64,

    pub impressions: u64,

    pub clicks: u64,

    /// Click-through rate in [0, 1]
    pub ctr: f64,
}

impl RankObservation {
    /// Build an observation from an analytics row's measures.
    pub fn from_row(keyword_id: KeywordId, date: NaiveDate, row: &AnalyticsRow) -> Self {
        Self {
            keyword_id,
            date,
            position: row.position,
            impressions: to_count(row.impressions),
            clicks: to_count(row.clicks),
            ctr: row.ctr.clamp(0.0, 1.0),
        }
    }
}

/// The source reports counts as JSON numbers; coerce into the count domain.
fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}
