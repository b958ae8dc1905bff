//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Largest accepted `gsc.token_refresh_skew_secs` (one day).
pub const MAX_REFRESH_SKEW_SECS: i64 = 86_400;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Relational store location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Credential slot location
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Search Console client and OAuth settings
    #[serde(default)]
    pub gsc: GscConfig,

    /// Sync window policy
    #[serde(default)]
    pub sync: SyncConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment overrides for secrets and deployment paths.
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(id) = var("GSC_CLIENT_ID") {
            self.gsc.client_id = id;
        }
        if let Some(secret) = var("GSC_CLIENT_SECRET") {
            self.gsc.client_secret = secret;
        }
        if let Some(uri) = var("GSC_REDIRECT_URI") {
            self.gsc.redirect_uri = uri;
        }
        if let Some(path) = var("DATABASE_PATH") {
            self.database.path = path;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.gsc.page_size == 0 {
            return Err(AppError::validation("gsc.page_size must be > 0"));
        }
        if self.gsc.timeout_secs == 0 {
            return Err(AppError::validation("gsc.timeout_secs must be > 0"));
        }
        if self.gsc.user_agent.trim().is_empty() {
            return Err(AppError::validation("gsc.user_agent is empty"));
        }
        if self.sync.backfill_months == 0 {
            return Err(AppError::validation("sync.backfill_months must be > 0"));
        }
        if self.sync.backfill_months > self.sync.max_backfill_months {
            return Err(AppError::validation(
                "sync.backfill_months exceeds sync.max_backfill_months",
            ));
        }
        if self.sync.incremental_delay_days < self.sync.reporting_delay_days {
            return Err(AppError::validation(
                "sync.incremental_delay_days must not be inside the reporting delay",
            ));
        }
        if !(0..=MAX_REFRESH_SKEW_SECS).contains(&self.gsc.token_refresh_skew_secs) {
            return Err(AppError::validation(format!(
                "gsc.token_refresh_skew_secs must be between 0 and {MAX_REFRESH_SKEW_SECS}"
            )));
        }
        if self.database.path.trim().is_empty() {
            return Err(AppError::validation("database.path is empty"));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file
    #[serde(default = "defaults::database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: defaults::database_path(),
        }
    }
}

/// Credential slot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Path to the persisted credential JSON
    #[serde(default = "defaults::credentials_path")]
    pub path: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: defaults::credentials_path(),
        }
    }
}

/// Search Console API and OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GscConfig {
    /// OAuth client identifier
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered with the OAuth client
    #[serde(default = "defaults::redirect_uri")]
    pub redirect_uri: String,

    /// Consent screen endpoint
    #[serde(default = "defaults::auth_url")]
    pub auth_url: String,

    /// Token exchange endpoint
    #[serde(default = "defaults::token_url")]
    pub token_url: String,

    /// Search Console API base
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Requested OAuth scope
    #[serde(default = "defaults::scope")]
    pub scope: String,

    /// Rows requested per analytics page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Refresh the access token this many seconds before it expires
    #[serde(default = "defaults::refresh_skew")]
    pub token_refresh_skew_secs: i64,
}

impl Default for GscConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: defaults::redirect_uri(),
            auth_url: defaults::auth_url(),
            token_url: defaults::token_url(),
            api_base: defaults::api_base(),
            scope: defaults::scope(),
            page_size: defaults::page_size(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            token_refresh_skew_secs: defaults::refresh_skew(),
        }
    }
}

/// Sync window policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Default backfill length in months
    #[serde(default = "defaults::backfill_months")]
    pub backfill_months: u32,

    /// Upper bound for a requested backfill
    #[serde(default = "defaults::max_backfill_months")]
    pub max_backfill_months: u32,

    /// Days the source needs before a day's metrics are final
    #[serde(default = "defaults::reporting_delay_days")]
    pub reporting_delay_days: u32,

    /// Offset of the single day fetched by incremental runs
    #[serde(default = "defaults::incremental_delay_days")]
    pub incremental_delay_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backfill_months: defaults::backfill_months(),
            max_backfill_months: defaults::max_backfill_months(),
            reporting_delay_days: defaults::reporting_delay_days(),
            incremental_delay_days: defaults::incremental_delay_days(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Emit JSON lines from the server
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            json: false,
        }
    }
}

mod defaults {
    pub fn host() -> String {
        "127.0.0.1".into()
    }
    pub fn port() -> u16 {
        3000
    }

    pub fn database_path() -> String {
        "data/ranks.db".into()
    }
    pub fn credentials_path() -> String {
        "data/credentials.json".into()
    }

    // Search Console defaults
    pub fn redirect_uri() -> String {
        "http://localhost:3000/api/gsc/auth/callback".into()
    }
    pub fn auth_url() -> String {
        "https://accounts.google.com/o/oauth2/v2/auth".into()
    }
    pub fn token_url() -> String {
        "https://oauth2.googleapis.com/token".into()
    }
    pub fn api_base() -> String {
        "https://www.googleapis.com/webmasters/v3/".into()
    }
    pub fn scope() -> String {
        "https://www.googleapis.com/auth/webmasters.readonly".into()
    }
    pub fn page_size() -> usize {
        25_000
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn user_agent() -> String {
        "rank-tracker/0.1".into()
    }
    pub fn refresh_skew() -> i64 {
        60
    }

    // Sync defaults
    pub fn backfill_months() -> u32 {
        3
    }
    pub fn max_backfill_months() -> u32 {
        16
    }
    pub fn reporting_delay_days() -> u32 {
        2
    }
    pub fn incremental_delay_days() -> u32 {
        3
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_reporting_policy() {
        let config = Config::default();
        assert_eq!(config.gsc.page_size, 25_000);
        assert_eq!(config.sync.backfill_months, 3);
        assert_eq!(config.sync.reporting_delay_days, 2);
        assert_eq!(config.sync.incremental_delay_days, 3);
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.gsc.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_incremental_inside_delay() {
        let mut config = Config::default();
        config.sync.incremental_delay_days = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_refresh_skew() {
        let mut config = Config::default();
        config.gsc.token_refresh_skew_secs = -1;
        assert!(config.validate().is_err());

        config.gsc.token_refresh_skew_secs = i64::MAX;
        assert!(config.validate().is_err());

        config.gsc.token_refresh_skew_secs = MAX_REFRESH_SKEW_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [gsc]
            client_id = "abc"
            page_size = 100

            [sync]
            backfill_months = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.gsc.client_id, "abc");
        assert_eq!(config.gsc.page_size, 100);
        assert_eq!(config.gsc.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.sync.backfill_months, 6);
        assert_eq!(config.sync.reporting_delay_days, 2);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn env_overrides_secrets() {
        let mut config = Config::default();
        config.apply_vars(|key| match key {
            "GSC_CLIENT_ID" => Some("id-from-env".to_string()),
            "GSC_CLIENT_SECRET" => Some("secret-from-env".to_string()),
            _ => None,
        });

        assert_eq!(config.gsc.client_id, "id-from-env");
        assert_eq!(config.gsc.client_secret, "secret-from-env");
        assert_eq!(
            config.gsc.redirect_uri,
            "http://localhost:3000/api/gsc/auth/callback"
        );
    }

    #[test]
    fn load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.database.path, "data/ranks.db");
    }
}
