// src/error.rs

//! Unified error handling for the rank tracker.

use std::fmt;

use thiserror::Error;

/// Result type alias for rank tracker operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No credential has ever been stored
    #[error("Not authenticated. Please authenticate via /api/gsc/auth")]
    NotAuthenticated,

    /// The OAuth provider refused the authorization request
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// The stored credential was rejected by the analytics source
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The analytics source lists no sites for this credential
    #[error("No sites found in Search Console")]
    NoSiteConfigured,

    /// Non-success response from an upstream API
    #[error("Upstream request failed ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Storage backend in an unusable state
    #[error("Storage error: {0}")]
    Storage(String),

    /// Calendar date could not be parsed or computed
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an invalid date error.
    pub fn invalid_date(message: impl fmt::Display) -> Self {
        Self::InvalidDate(message.to_string())
    }

    /// Create an upstream error from a status code and response text.
    pub fn upstream(status: u16, message: impl fmt::Display) -> Self {
        Self::Upstream {
            status,
            message: message.to_string(),
        }
    }

    /// Whether the error means the user has to (re-)authenticate.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AuthFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_flagged() {
        assert!(AppError::NotAuthenticated.is_auth());
        assert!(AppError::AuthFailed("expired".into()).is_auth());
        assert!(!AppError::NoSiteConfigured.is_auth());
        assert!(!AppError::upstream(500, "boom").is_auth());
    }

    #[test]
    fn test_upstream_message() {
        let err = AppError::upstream(503, "backend unavailable");
        assert_eq!(
            err.to_string(),
            "Upstream request failed (503): backend unavailable"
        );
    }
}
