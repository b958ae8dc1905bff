//! API routes
//!
//! Domain-grouped HTTP route handlers.

pub mod gsc;
pub mod keywords;

use axum::Router;

use crate::api::state::AppState;

/// Build the complete API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/gsc", gsc::routes())
        .merge(keywords::routes())
        .with_state(state)
}
