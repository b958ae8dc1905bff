//! Utility functions and helpers.

pub mod http;
pub mod log;

use chrono::{NaiveDate, Utc};

/// Today's calendar date in UTC.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}
