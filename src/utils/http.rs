// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::GscConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &GscConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Turn a non-success response into an error, classifying auth rejections.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body);
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Err(AppError::AuthFailed(format!("{status}: {message}")))
        }
        _ => Err(AppError::upstream(status.as_u16(), message)),
    }
}

/// Extract a readable message from a Google-style error body.
///
/// Handles `{"error": {"message": ...}}`, `{"error": "...", "error_description": ...}`
/// and falls back to the (truncated) raw body.
pub fn upstream_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.pointer("/error/message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
        if let Some(description) = value.get("error_description").and_then(|d| d.as_str()) {
            return description.to_string();
        }
        if let Some(code) = value.get("error").and_then(|e| e.as_str()) {
            return code.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(200).collect()
}
