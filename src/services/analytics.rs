// src/services/analytics.rs

//! Search Console analytics source.
//!
//! `SearchAnalytics::fetch_analytics` hides pagination: it keeps requesting
//! pages until one comes back short and returns every row in source order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AnalyticsQuery, AnalyticsRow, Credential, DateRange, Dimension, GscConfig};
use crate::services::oauth::OAuthProvider;
use crate::storage::CredentialStore;
use crate::utils::http::check_status;

/// Largest page the Search Console API returns.
pub const DEFAULT_PAGE_SIZE: usize = 25_000;

/// Read access to a site's search analytics.
#[async_trait]
pub trait SearchAnalytics: Send + Sync {
    /// Site URLs the credential can read, in source order.
    async fn list_sites(&self) -> Result<Vec<String>>;

    /// Fetch a single page of rows.
    async fn query_page(&self, site_url: &str, query: &AnalyticsQuery)
    -> Result<Vec<AnalyticsRow>>;

    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    /// Fetch every row for `range`, following pages until a short one.
    ///
    /// A failure on any page fails the whole fetch; no partial result is
    /// returned.
    async fn fetch_analytics(
        &self,
        site_url: &str,
        range: DateRange,
        dimensions: &[Dimension],
    ) -> Result<Vec<AnalyticsRow>> {
        let page_size = self.page_size().max(1);
        let mut query = AnalyticsQuery::first_page(range, dimensions, page_size);
        let mut rows = Vec::new();

        loop {
            let page = self.query_page(site_url, &query).await?;
            let fetched = page.len();
            log::debug!(
                "Fetched {} rows at offset {} for {} ({})",
                fetched,
                query.start_row,
                site_url,
                range
            );
            rows.extend(page);

            if fetched < page_size {
                break;
            }
            query.next_page();
        }

        Ok(rows)
    }
}

/// Builds an analytics source bound to a credential.
pub trait SourceFactory: Send + Sync {
    fn connect(&self, credential: Credential) -> Arc<dyn SearchAnalytics>;
}

/// Credential holder that refreshes the access token shortly before expiry.
///
/// Refreshed credentials are written back to the credential store.
pub struct Session {
    credential: Mutex<Credential>,
    oauth: Arc<dyn OAuthProvider>,
    store: Arc<dyn CredentialStore>,
    skew: Duration,
}

impl Session {
    pub fn new(
        credential: Credential,
        oauth: Arc<dyn OAuthProvider>,
        store: Arc<dyn CredentialStore>,
        skew: Duration,
    ) -> Self {
        Self {
            credential: Mutex::new(credential),
            oauth,
            store,
            skew,
        }
    }

    /// A usable access token, refreshing first if it is about to expire.
    pub async fn access_token(&self) -> Result<String> {
        let mut credential = self.credential.lock().await;

        if credential.expires_within(Utc::now(), self.skew) {
            if credential.can_refresh() {
                let refreshed = self.oauth.refresh(&credential).await?;
                self.store.save(refreshed.clone()).await?;
                *credential = refreshed;
            } else {
                log::warn!("Access token expired and no refresh token is stored");
            }
        }

        Ok(credential.access_token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SitesResponse {
    #[serde(default, rename = "siteEntry")]
    site_entry: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize)]
struct SiteEntry {
    #[serde(rename = "siteUrl")]
    site_url: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<AnalyticsRow>,
}

/// Search Console v3 REST client.
pub struct SearchConsoleClient {
    client: Client,
    api_base: Url,
    page_size: usize,
    session: Session,
}

impl SearchConsoleClient {
    fn sites_url(&self) -> Result<Url> {
        Ok(self.api_base.join("sites")?)
    }

    fn query_url(&self, site_url: &str) -> Result<Url> {
        let site: String = url::form_urlencoded::byte_serialize(site_url.as_bytes()).collect();
        Ok(self
            .api_base
            .join(&format!("sites/{site}/searchAnalytics/query"))?)
    }
}

#[async_trait]
impl SearchAnalytics for SearchConsoleClient {
    async fn list_sites(&self) -> Result<Vec<String>> {
        let token = self.session.access_token().await?;
        let response = self
            .client
            .get(self.sites_url()?)
            .bearer_auth(token)
            .send()
            .await?;
        let sites: SitesResponse = check_status(response).await?.json().await?;

        Ok(sites.site_entry.into_iter().map(|s| s.site_url).collect())
    }

    async fn query_page(
        &self,
        site_url: &str,
        query: &AnalyticsQuery,
    ) -> Result<Vec<AnalyticsRow>> {
        let token = self.session.access_token().await?;
        let response = self
            .client
            .post(self.query_url(site_url)?)
            .bearer_auth(token)
            .json(query)
            .send()
            .await?;
        let body: QueryResponse = check_status(response).await?.json().await?;

        Ok(body.rows)
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Connects `SearchConsoleClient`s sharing one HTTP client.
pub struct SearchConsoleConnector {
    client: Client,
    api_base: Url,
    page_size: usize,
    skew: Duration,
    oauth: Arc<dyn OAuthProvider>,
    store: Arc<dyn CredentialStore>,
}

impl SearchConsoleConnector {
    pub fn new(
        client: Client,
        config: &GscConfig,
        oauth: Arc<dyn OAuthProvider>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base)?;
        if api_base.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "gsc.api_base is not a base URL: {}",
                config.api_base
            )));
        }

        let skew = Duration::try_seconds(config.token_refresh_skew_secs)
            .filter(|skew| *skew >= Duration::zero())
            .ok_or_else(|| {
                AppError::config(format!(
                    "gsc.token_refresh_skew_secs out of range: {}",
                    config.token_refresh_skew_secs
                ))
            })?;

        Ok(Self {
            client,
            api_base,
            page_size: config.page_size.clamp(1, DEFAULT_PAGE_SIZE),
            skew,
            oauth,
            store,
        })
    }

    fn client_for(&self, credential: Credential) -> SearchConsoleClient {
        SearchConsoleClient {
            client: self.client.clone(),
            api_base: self.api_base.clone(),
            page_size: self.page_size,
            session: Session::new(
                credential,
                Arc::clone(&self.oauth),
                Arc::clone(&self.store),
                self.skew,
            ),
        }
    }
}

impl SourceFactory for SearchConsoleConnector {
    fn connect(&self, credential: Credential) -> Arc<dyn SearchAnalytics> {
        Arc::new(self.client_for(credential))
    }
}
