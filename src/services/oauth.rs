// src/services/oauth.rs

//! OAuth2 authorization-code flow against the Google token endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Credential, GscConfig};
use crate::utils::http::upstream_message;

/// Provider of OAuth consent URLs and token exchanges.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the user is sent to for consent.
    fn authorize_url(&self) -> Result<String>;

    /// Exchange an authorization code for a credential.
    async fn exchange_code(&self, code: &str) -> Result<Credential>;

    /// Obtain a fresh access token using the credential's refresh token.
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;
}

/// Token endpoint success body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credential(self, now: DateTime<Utc>) -> Credential {
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl)),
            token_type: self.token_type,
            scope: self.scope,
            created_at: now,
        }
    }
}

/// Google OAuth2 client for the Search Console scope.
pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    scope: String,
}

impl GoogleOAuth {
    pub fn new(client: Client, config: &GscConfig) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            scope: config.scope.clone(),
        }
    }

    fn ensure_client(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AppError::config("gsc.client_id is not set"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(AppError::config("gsc.client_secret is not set"));
        }
        Ok(())
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.client.post(&self.token_url).form(form).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = upstream_message(&response.text().await.unwrap_or_default());
        if status.is_client_error() {
            Err(AppError::AuthorizationDenied(message))
        } else {
            Err(AppError::upstream(status.as_u16(), message))
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn authorize_url(&self) -> Result<String> {
        self.ensure_client()?;
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.ensure_client()?;
        if code.trim().is_empty() {
            return Err(AppError::validation("authorization code is empty"));
        }

        let token = self
            .post_token(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        log::info!("Exchanged authorization code for a new credential");
        Ok(token.into_credential(Utc::now()))
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        self.ensure_client()?;
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::AuthFailed("no refresh token stored".into()))?;

        let token = self
            .post_token(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(|e| match e {
                AppError::AuthorizationDenied(message) => AppError::AuthFailed(message),
                other => other,
            })?;

        let mut refreshed = token.into_credential(Utc::now());
        // Google omits the refresh token on refresh responses.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = credential.refresh_token.clone();
        }
        if refreshed.scope.is_none() {
            refreshed.scope = credential.scope.clone();
        }

        log::info!("Refreshed access token");
        Ok(refreshed)
    }
}
