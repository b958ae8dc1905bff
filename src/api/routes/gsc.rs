//! Search Console routes
//!
//! OAuth consent and callback, sync triggers, and credential status.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::error::Result;
use crate::api::state::AppState;
use crate::models::{DATE_FORMAT, DateRange};
use crate::pipeline::SyncOutcome;

/// Search Console routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth", get(auth))
        .route("/auth/callback", get(auth_callback))
        .route("/fetch", get(fetch_incremental).post(fetch_backfill))
        .route("/status", get(status))
}

/// 302 redirect to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Redirect to the home page with a single query parameter.
fn home_with(key: &str, value: &str) -> Response {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    found(&format!("/?{query}"))
}

/// Redirect to the OAuth consent screen
///
/// GET /api/gsc/auth
async fn auth(State(state): State<AppState>) -> Response {
    match state.oauth.authorize_url() {
        Ok(url) => found(&url),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build authorization URL");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to generate authentication URL. Check GSC credentials."
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Exchange the authorization code and store the credential
///
/// GET /api/gsc/auth/callback
async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth provider returned an error");
        return home_with("error", &error);
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return home_with("error", "No authorization code received");
    };

    let stored = match state.oauth.exchange_code(&code).await {
        Ok(credential) => state.credentials.save(credential).await,
        Err(e) => Err(e),
    };

    match stored {
        Ok(()) => {
            tracing::info!("Search Console authentication completed");
            home_with("success", "authenticated")
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth callback failed");
            home_with("error", "Failed to complete authentication")
        }
    }
}

/// Optional backfill parameters.
///
/// Each field is read on its own: a mistyped field is treated as absent
/// without discarding the others, and a body that is not JSON means defaults.
#[derive(Debug, Default)]
struct FetchRequest {
    site_url: Option<String>,
    months: Option<i64>,
}

impl FetchRequest {
    fn parse(body: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };

        let site_url = value
            .get("siteUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        let months = value.get("months").and_then(|m| {
            m.as_i64()
                .or_else(|| m.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        });

        Self { site_url, months }
    }

    /// Non-positive months fall back to the default.
    fn months(&self) -> Option<u32> {
        self.months
            .filter(|m| *m > 0)
            .map(|m| u32::try_from(m).unwrap_or(u32::MAX))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackfillResponse {
    success: bool,
    site_url: String,
    date_range: DateRange,
    total_rows: usize,
    matched_keywords: usize,
    upserted_records: usize,
}

/// On-demand backfill sync
///
/// POST /api/gsc/fetch
async fn fetch_backfill(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request = FetchRequest::parse(&body);
    let outcome = state
        .sync
        .backfill(request.site_url.as_deref(), request.months(), state.today())
        .await?;

    let response = match outcome {
        SyncOutcome::NoKeywords { .. } => Json(json!({
            "message": "No keywords registered. Add keywords first."
        }))
        .into_response(),
        SyncOutcome::Completed(report) => {
            tracing::info!(
                site_url = %report.site_url,
                range = %report.range,
                rows = report.reconcile.total_rows,
                written = report.reconcile.written,
                "Backfill complete"
            );
            Json(BackfillResponse {
                success: true,
                site_url: report.site_url,
                date_range: report.range,
                total_rows: report.reconcile.total_rows,
                matched_keywords: report.reconcile.matched,
                upserted_records: report.reconcile.written,
            })
            .into_response()
        }
    };
    Ok(response)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IncrementalResponse {
    success: bool,
    date: String,
    upserted_records: usize,
}

/// Scheduled single-day sync
///
/// GET /api/gsc/fetch
async fn fetch_incremental(State(state): State<AppState>) -> Result<Response> {
    let outcome = state.sync.incremental(None, state.today()).await?;

    let response = match outcome {
        SyncOutcome::NoKeywords { .. } => {
            Json(json!({ "message": "No keywords registered" })).into_response()
        }
        SyncOutcome::Completed(report) => {
            tracing::info!(
                site_url = %report.site_url,
                date = %report.range.start,
                written = report.reconcile.written,
                "Incremental sync complete"
            );
            Json(IncrementalResponse {
                success: true,
                date: report.range.start.format(DATE_FORMAT).to_string(),
                upserted_records: report.reconcile.written,
            })
            .into_response()
        }
    };
    Ok(response)
}

/// Credential existence check
///
/// GET /api/gsc/status
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "authenticated": state.credentials.is_authenticated().await }))
}
