//! Integration tests for the HTTP routes
//!
//! The router runs against in-memory SQLite and scripted fakes of the OAuth
//! provider and the analytics source.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tower::ServiceExt;

use rank_tracker::{
    api::{AppState, build_router},
    error::{AppError, Result},
    models::{
        AnalyticsQuery, AnalyticsRow, Credential, Priority, Seed, SeedCategory, SeedKeyword,
        SeedProduct, SyncConfig,
    },
    pipeline::RankSync,
    services::{OAuthProvider, SearchAnalytics, SourceFactory},
    storage::{CredentialStore, RankStore, SqliteStorage},
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

struct FakeOAuth {
    configured: bool,
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn authorize_url(&self) -> Result<String> {
        if self.configured {
            Ok("https://accounts.example.com/auth?client_id=test".to_string())
        } else {
            Err(AppError::config("gsc.client_id is not set"))
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential> {
        match code {
            "good-code" => Ok(Credential::new("access-token")),
            _ => Err(AppError::AuthorizationDenied("invalid_grant".into())),
        }
    }

    async fn refresh(&self, _credential: &Credential) -> Result<Credential> {
        Ok(Credential::new("refreshed"))
    }
}

#[derive(Default)]
struct MemoryCredentials {
    slot: Mutex<Option<Credential>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn save(&self, credential: Credential) -> Result<()> {
        *self.slot.lock().unwrap() = Some(credential);
        Ok(())
    }

    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn is_authenticated(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

/// Source returning the same rows for any window; `fail` makes every page
/// request an upstream error.
struct FakeSource {
    sites: Vec<String>,
    rows: Vec<AnalyticsRow>,
    fail: bool,
    requests: Mutex<Vec<AnalyticsQuery>>,
}

#[async_trait]
impl SearchAnalytics for FakeSource {
    async fn list_sites(&self) -> Result<Vec<String>> {
        Ok(self.sites.clone())
    }

    async fn query_page(&self, _site_url: &str, query: &AnalyticsQuery) -> Result<Vec<AnalyticsRow>> {
        self.requests.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(AppError::upstream(503, "Backend Error"));
        }
        Ok(self.rows.clone())
    }
}

struct FakeFactory(Arc<FakeSource>);

impl SourceFactory for FakeFactory {
    fn connect(&self, _credential: Credential) -> Arc<dyn SearchAnalytics> {
        self.0.clone()
    }
}

struct TestApp {
    router: Router,
    credentials: Arc<MemoryCredentials>,
    storage: SqliteStorage,
    source: Arc<FakeSource>,
}

struct Setup {
    sites: Vec<&'static str>,
    rows: Vec<AnalyticsRow>,
    keywords: Vec<&'static str>,
    fail: bool,
    oauth_configured: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            sites: vec!["sc-domain:example.com"],
            rows: vec![
                row("Running Shoes", "2024-06-12", 4.5),
                row("trail boots", "2024-06-12", 12.0),
                row("unrelated query", "2024-06-12", 2.0),
            ],
            keywords: vec!["running shoes", "Trail Boots"],
            fail: false,
            oauth_configured: true,
        }
    }
}

fn row(query: &str, date: &str, position: f64) -> AnalyticsRow {
    AnalyticsRow {
        keys: vec![query.to_string(), date.to_string()],
        clicks: 3.0,
        impressions: 90.0,
        ctr: 3.0 / 90.0,
        position,
    }
}

fn test_app(setup: Setup) -> TestApp {
    let storage = SqliteStorage::open_in_memory().unwrap();
    if !setup.keywords.is_empty() {
        let seed = Seed {
            categories: vec![SeedCategory {
                name: "Footwear".into(),
                products: vec![SeedProduct {
                    name: "Outdoor".into(),
                    keywords: setup
                        .keywords
                        .iter()
                        .map(|q| SeedKeyword {
                            query: q.to_string(),
                            priority: Priority::High,
                            target_url: None,
                        })
                        .collect(),
                }],
            }],
        };
        storage.import_seed(&seed).unwrap();
    }

    let source = Arc::new(FakeSource {
        sites: setup.sites.iter().map(|s| s.to_string()).collect(),
        rows: setup.rows,
        fail: setup.fail,
        requests: Mutex::new(Vec::new()),
    });
    let credentials = Arc::new(MemoryCredentials::default());

    let sync = RankSync::new(
        credentials.clone(),
        Arc::new(storage.clone()),
        Arc::new(storage.clone()),
        Arc::new(FakeFactory(source.clone())),
        &SyncConfig::default(),
    );

    let state = AppState {
        sync: Arc::new(sync),
        oauth: Arc::new(FakeOAuth {
            configured: setup.oauth_configured,
        }),
        credentials: credentials.clone(),
        ranks: Arc::new(storage.clone()),
        clock: today,
    };

    TestApp {
        router: build_router(state),
        credentials,
        storage,
        source,
    }
}

impl TestApp {
    async fn login(&self) {
        self.credentials
            .save(Credential::new("access-token"))
            .await
            .unwrap();
    }
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn location(app: &TestApp, uri: &str) -> (StatusCode, String) {
    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, uri))
        .await
        .unwrap();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    (response.status(), location)
}

#[tokio::test]
async fn test_fetch_requires_authentication() {
    let app = test_app(Setup::default());

    for method in [Method::POST, Method::GET] {
        let (status, body) = send(&app, request(method.clone(), "/api/gsc/fetch")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} without credential");
        assert!(body["error"].as_str().unwrap().contains("Not authenticated"));
    }
    assert!(app.source.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_without_sites_is_not_found() {
    let app = test_app(Setup {
        sites: vec![],
        ..Setup::default()
    });
    app.login().await;

    let (status, body) = send(&app, request(Method::GET, "/api/gsc/fetch")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No sites found in Search Console");

    let (status, _) = send(&app, json_request("/api/gsc/fetch", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fetch_without_keywords_returns_message() {
    let app = test_app(Setup {
        keywords: vec![],
        ..Setup::default()
    });
    app.login().await;

    let (status, body) = send(&app, json_request("/api/gsc/fetch", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "No keywords registered. Add keywords first." }));

    let (status, body) = send(&app, request(Method::GET, "/api/gsc/fetch")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "No keywords registered" }));
}

#[tokio::test]
async fn test_backfill_response() {
    let app = test_app(Setup::default());
    app.login().await;

    let (status, body) = send(&app, json_request("/api/gsc/fetch", json!({ "months": 3 }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "siteUrl": "sc-domain:example.com",
            "dateRange": { "start": "2024-03-13", "end": "2024-06-13" },
            "totalRows": 3,
            "matchedKeywords": 2,
            "upsertedRecords": 2
        })
    );
    assert_eq!(app.storage.count_ranks().await.unwrap(), 2);
}

#[tokio::test]
async fn test_backfill_with_site_and_empty_body() {
    let app = test_app(Setup::default());
    app.login().await;

    let (status, body) = send(
        &app,
        json_request("/api/gsc/fetch", json!({ "siteUrl": "https://shop.example.com/" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["siteUrl"], "https://shop.example.com/");

    // No body at all falls back to defaults.
    let (status, body) = send(&app, request(Method::POST, "/api/gsc/fetch")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["siteUrl"], "sc-domain:example.com");
    assert_eq!(body["dateRange"]["start"], "2024-03-13");
}

#[tokio::test]
async fn test_backfill_mistyped_months_keeps_site() {
    let app = test_app(Setup::default());
    app.login().await;

    let (status, body) = send(
        &app,
        json_request(
            "/api/gsc/fetch",
            json!({ "siteUrl": "https://shop.example.com/", "months": "6" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["siteUrl"], "https://shop.example.com/");
    assert_eq!(body["dateRange"]["start"], "2024-03-13");
}

#[tokio::test]
async fn test_backfill_rejects_too_many_months() {
    let app = test_app(Setup::default());
    app.login().await;

    let (status, body) = send(&app, json_request("/api/gsc/fetch", json!({ "months": 24 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("months"));
}

#[tokio::test]
async fn test_incremental_response() {
    let app = test_app(Setup::default());
    app.login().await;

    let (status, body) = send(&app, request(Method::GET, "/api/gsc/fetch")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "date": "2024-06-12", "upsertedRecords": 2 })
    );
    let requests = app.source.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].start_date, requests[0].end_date);
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent() {
    let app = test_app(Setup::default());
    app.login().await;

    send(&app, request(Method::GET, "/api/gsc/fetch")).await;
    let (_, body) = send(&app, request(Method::GET, "/api/gsc/fetch")).await;

    assert_eq!(body["upsertedRecords"], 2);
    assert_eq!(app.storage.count_ranks().await.unwrap(), 2);
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let app = test_app(Setup {
        fail: true,
        ..Setup::default()
    });
    app.login().await;

    let (status, body) = send(&app, request(Method::GET, "/api/gsc/fetch")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Backend Error"));
    assert_eq!(app.storage.count_ranks().await.unwrap(), 0);
}

#[tokio::test]
async fn test_auth_redirects_to_consent() {
    let app = test_app(Setup::default());

    let (status, location) = location(&app, "/api/gsc/auth").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location, "https://accounts.example.com/auth?client_id=test");
}

#[tokio::test]
async fn test_auth_without_client_is_error() {
    let app = test_app(Setup {
        oauth_configured: false,
        ..Setup::default()
    });

    let (status, body) = send(&app, request(Method::GET, "/api/gsc/auth")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Failed to generate authentication URL. Check GSC credentials."
    );
}

#[tokio::test]
async fn test_callback_redirects() {
    let app = test_app(Setup::default());

    let (status, loc) = location(&app, "/api/gsc/auth/callback?error=access_denied").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(loc, "/?error=access_denied");

    let (_, loc) = location(&app, "/api/gsc/auth/callback").await;
    assert_eq!(loc, "/?error=No+authorization+code+received");

    let (_, loc) = location(&app, "/api/gsc/auth/callback?code=bad-code").await;
    assert_eq!(loc, "/?error=Failed+to+complete+authentication");
    assert!(!app.credentials.is_authenticated().await);

    let (_, loc) = location(&app, "/api/gsc/auth/callback?code=good-code").await;
    assert_eq!(loc, "/?success=authenticated");
    assert!(app.credentials.is_authenticated().await);
}

#[tokio::test]
async fn test_status_reports_credential() {
    let app = test_app(Setup::default());

    let (_, body) = send(&app, request(Method::GET, "/api/gsc/status")).await;
    assert_eq!(body, json!({ "authenticated": false }));

    app.login().await;
    let (_, body) = send(&app, request(Method::GET, "/api/gsc/status")).await;
    assert_eq!(body, json!({ "authenticated": true }));
}

#[tokio::test]
async fn test_keyword_history() {
    let app = test_app(Setup::default());
    app.login().await;
    send(&app, request(Method::GET, "/api/gsc/fetch")).await;

    let (status, body) = send(&app, request(Method::GET, "/api/keywords?months=1")).await;
    assert_eq!(status, StatusCode::OK);

    let keywords = body.as_array().unwrap();
    assert_eq!(keywords.len(), 2);
    let shoes = keywords
        .iter()
        .find(|k| k["query"] == "running shoes")
        .unwrap();
    assert_eq!(shoes["priority"], 1);
    assert_eq!(shoes["ranks"][0]["date"], "2024-06-12");
    assert_eq!(shoes["ranks"][0]["position"], 4.5);
    assert_eq!(shoes["ranks"][0]["impressions"], 90);
}
