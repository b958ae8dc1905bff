// src/config.rs

//! Configuration loading and service wiring.
//!
//! Configuration is read once at start-up and passed explicitly into every
//! constructor; there is no process-wide client.

use std::path::Path;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Config, Seed};
use crate::pipeline::RankSync;
use crate::services::{GoogleOAuth, OAuthProvider, SearchConsoleConnector};
use crate::storage::{FileCredentialStore, SqliteStorage};
use crate::utils::{http, log};

/// Load configuration from a TOML file, apply environment overrides and
/// validate the result.
///
/// A missing or unreadable file falls back to defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path).apply_env();
    config.validate()?;
    Ok(config)
}

/// Load and validate a keyword seed file.
pub fn load_seed(path: &Path) -> Result<Seed> {
    let seed = Seed::load(path)?;
    seed.validate()
        .map_err(|e| AppError::config(format!("Invalid seed data in {path:?}: {e}")))?;
    Ok(seed)
}

/// Every long-lived collaborator, built from one `Config`.
pub struct Services {
    pub credentials: Arc<FileCredentialStore>,
    pub storage: SqliteStorage,
    pub oauth: Arc<dyn OAuthProvider>,
    pub sync: Arc<RankSync>,
}

impl Services {
    pub async fn from_config(config: Config) -> Result<Self> {
        let client = http::create_async_client(&config.gsc)?;
        let credentials = Arc::new(FileCredentialStore::open(&config.credentials.path).await?);
        let storage = SqliteStorage::open(&config.database.path)?;

        let oauth: Arc<dyn OAuthProvider> = Arc::new(GoogleOAuth::new(client.clone(), &config.gsc));
        let connector = SearchConsoleConnector::new(
            client,
            &config.gsc,
            Arc::clone(&oauth),
            credentials.clone(),
        )?;

        let sync = RankSync::new(
            credentials.clone(),
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            Arc::new(connector),
            &config.sync,
        );

        log::sub_item(&format!("Database: {}", config.database.path));
        log::sub_item(&format!("Credentials: {}", config.credentials.path));

        Ok(Self {
            credentials,
            storage,
            oauth,
            sync: Arc::new(sync),
        })
    }
}
