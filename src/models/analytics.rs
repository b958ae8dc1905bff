// src/models/analytics.rs

//! Search analytics request and row structures.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Calendar date format used on the wire and in storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Grouping dimension for an analytics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Query,
    Date,
    Page,
    Country,
    Device,
    SearchAppearance,
}

/// Dimensions whose keys the rank reconciler reads: `[query, date]`.
pub const RANK_DIMENSIONS: [Dimension; 2] = [Dimension::Query, Dimension::Date];

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::invalid_date(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Request body of a single analytics page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<Dimension>,
    pub row_limit: usize,
    pub start_row: usize,
}

impl AnalyticsQuery {
    /// First page of a query over `range`.
    pub fn first_page(range: DateRange, dimensions: &[Dimension], page_size: usize) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
            dimensions: dimensions.to_vec(),
            row_limit: page_size,
            start_row: 0,
        }
    }

    /// Advance the offset to the following page.
    pub fn next_page(&mut self) {
        self.start_row += self.row_limit;
    }
}

/// One grouped row returned by the analytics source.
///
/// `keys` follow the dimension order of the query that produced the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalyticsRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

impl AnalyticsRow {
    /// Key value at a dimension position, if present.
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }
}

/// Parse a `YYYY-MM-DD` string into a calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| AppError::invalid_date(format!("'{value}': {e}")))
}
