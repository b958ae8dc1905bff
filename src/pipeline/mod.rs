//! Pipeline entry points for rank syncs.
//!
//! - `WindowPolicy`: date range for backfill and incremental runs
//! - `RankSync`: credential check, fetch, and reconcile in one run

pub mod sync;
pub mod window;

pub use sync::{RankSync, SyncOutcome, SyncReport};
pub use window::{SyncMode, WindowPolicy};
