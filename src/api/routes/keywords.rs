//! Keyword history routes

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Months;
use serde::Deserialize;

use crate::api::error::Result;
use crate::api::state::AppState;
use crate::error::AppError;
use crate::models::KeywordHistory;

const DEFAULT_HISTORY_MONTHS: u32 = 3;

/// Keyword routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/keywords", get(history))
}

#[derive(Debug, Default, Deserialize)]
struct HistoryParams {
    months: Option<u32>,
}

/// Keywords with their rank observations for the last N months
///
/// GET /api/keywords?months=N
async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<KeywordHistory>>> {
    let months = params
        .months
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_HISTORY_MONTHS);
    let today = state.today();
    let since = today
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| AppError::validation(format!("months out of range: {months}")))?;

    Ok(Json(state.ranks.history_since(since).await?))
}
