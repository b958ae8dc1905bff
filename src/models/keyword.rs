// src/models/keyword.rs

//! Registered keyword data structures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Opaque keyword identifier assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordId(pub i64);

impl fmt::Display for KeywordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keyword priority tier. Lower value sorts first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    High = 1,
    #[default]
    Medium = 2,
    Low = 3,
}

impl TryFrom<u8> for Priority {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(AppError::validation(format!(
                "priority must be 1..=3, got {other}"
            ))),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

/// A keyword registered for rank tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: KeywordId,

    /// Query string as stored (matched case-insensitively)
    pub query: String,

    pub priority: Priority,

    /// Landing page the keyword should rank for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,

    /// Owning product
    pub product_id: i64,
}

impl Keyword {
    /// Normalized form used for matching against analytics queries.
    pub fn match_key(&self) -> String {
        normalize_query(&self.query)
    }
}

/// Lower-case a query for case-insensitive matching.
pub fn normalize_query(query: &str) -> String {
    query.to_lowercase()
}
