//! Application state
//!
//! Shared collaborators for the HTTP handlers.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::Services;
use crate::pipeline::RankSync;
use crate::services::OAuthProvider;
use crate::storage::{CredentialStore, RankStore};
use crate::utils::utc_today;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<RankSync>,
    pub oauth: Arc<dyn OAuthProvider>,
    pub credentials: Arc<dyn CredentialStore>,
    pub ranks: Arc<dyn RankStore>,
    /// Source of "today" for sync windows
    pub clock: fn() -> NaiveDate,
}

impl AppState {
    pub fn from_services(services: &Services) -> Self {
        Self {
            sync: Arc::clone(&services.sync),
            oauth: Arc::clone(&services.oauth),
            credentials: services.credentials.clone(),
            ranks: Arc::new(services.storage.clone()),
            clock: utc_today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }
}
