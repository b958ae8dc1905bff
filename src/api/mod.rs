//! HTTP API for authentication and rank syncs.
//!
//! - `GET  /api/gsc/auth`: redirect to the OAuth consent screen
//! - `GET  /api/gsc/auth/callback`: store the credential, redirect home
//! - `POST /api/gsc/fetch`: on-demand backfill
//! - `GET  /api/gsc/fetch`: scheduled incremental sync
//! - `GET  /api/gsc/status`: credential existence
//! - `GET  /api/keywords`: keywords with rank history

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
