// src/pipeline/window.rs

//! Sync window policy.
//!
//! The source does not finalize a day's metrics until a couple of days later,
//! so every window ends outside that reporting delay.

use chrono::{Days, Months, NaiveDate};

use crate::error::{AppError, Result};
use crate::models::{DateRange, SyncConfig};

/// How a sync picks its date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// `months` back from the last finalized day
    Backfill { months: u32 },
    /// The single most recently finalized day, with a safety margin
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub reporting_delay_days: u32,
    pub incremental_delay_days: u32,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl WindowPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            reporting_delay_days: config.reporting_delay_days,
            incremental_delay_days: config.incremental_delay_days,
        }
    }

    /// `end = today - delay`, `start = end - months`.
    pub fn backfill(&self, today: NaiveDate, months: u32) -> Result<DateRange> {
        let end = days_before(today, self.reporting_delay_days)?;
        let start = end
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| AppError::invalid_date(format!("{end} minus {months} months")))?;
        DateRange::new(start, end)
    }

    /// Single day at `today - incremental delay`.
    pub fn incremental(&self, today: NaiveDate) -> Result<DateRange> {
        Ok(DateRange::single_day(days_before(
            today,
            self.incremental_delay_days,
        )?))
    }

    pub fn window(&self, mode: SyncMode, today: NaiveDate) -> Result<DateRange> {
        match mode {
            SyncMode::Backfill { months } => self.backfill(today, months),
            SyncMode::Incremental => self.incremental(today),
        }
    }
}

fn days_before(day: NaiveDate, days: u32) -> Result<NaiveDate> {
    day.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| AppError::invalid_date(format!("{day} minus {days} days")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_backfill_three_months() {
        let range = WindowPolicy::default()
            .backfill(day(2024, 6, 15), 3)
            .unwrap();

        assert_eq!(range.end, day(2024, 6, 13));
        assert_eq!(range.start, day(2024, 3, 13));
    }

    #[test]
    fn test_backfill_clamps_month_end() {
        // 2024-05-31 minus 3 months has no 31st; chrono clamps to the last day.
        let range = WindowPolicy::default()
            .backfill(day(2024, 6, 2), 3)
            .unwrap();

        assert_eq!(range.end, day(2024, 5, 31));
        assert_eq!(range.start, day(2024, 2, 29));
    }

    #[test]
    fn test_backfill_crosses_year() {
        let range = WindowPolicy::default()
            .backfill(day(2024, 1, 1), 3)
            .unwrap();

        assert_eq!(range.end, day(2023, 12, 30));
        assert_eq!(range.start, day(2023, 9, 30));
    }

    #[test]
    fn test_incremental_single_day() {
        let range = WindowPolicy::default().incremental(day(2024, 3, 1)).unwrap();

        assert!(range.is_single_day());
        assert_eq!(range.start, day(2024, 2, 27));
    }

    #[test]
    fn test_window_by_mode() {
        let policy = WindowPolicy {
            reporting_delay_days: 1,
            incremental_delay_days: 5,
        };
        let today = day(2024, 3, 10);

        assert_eq!(
            policy.window(SyncMode::Incremental, today).unwrap(),
            DateRange::single_day(day(2024, 3, 5))
        );
        assert_eq!(
            policy
                .window(SyncMode::Backfill { months: 1 }, today)
                .unwrap(),
            DateRange::new(day(2024, 2, 9), day(2024, 3, 9)).unwrap()
        );
    }
}
