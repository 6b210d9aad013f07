//! Error taxonomy for the session core.
//!
//! ERROR HANDLING
//! ==============
//! `FetchError` never leaves the session cache: every variant collapses into
//! "no identity" so a failed lookup degrades to a login redirect instead of a
//! broken render. `LoginError` is the only error surfaced to a person, and it
//! keeps transport failures apart from structured server rejections.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

// =============================================================================
// IDENTITY FETCH
// =============================================================================

/// Failure of `GET /api/users/me`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Any non-2xx response.
    #[error("not authenticated (status {status})")]
    Unauthenticated { status: u16 },

    /// No response was obtained.
    #[error("identity request failed: {0}")]
    Transport(String),

    /// A 2xx response whose body is not an identity.
    #[error("identity response parse failed: {0}")]
    Decode(String),
}

// =============================================================================
// LOGIN MUTATION
// =============================================================================

/// Failure of `POST /api/users/login`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoginError {
    /// The server answered with a non-2xx status. `body` is the parsed response
    /// body; a body that is not JSON is kept as a JSON string.
    #[error("login rejected (status {status})")]
    Rejected { status: u16, body: Value },

    /// No response was obtained.
    #[error("login request failed: {0}")]
    Transport(String),
}

impl LoginError {
    /// Build a rejection from a raw response body.
    #[must_use]
    pub fn rejected(status: u16, raw: &str) -> Self {
        let body = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
        Self::Rejected { status, body }
    }

    /// Human-facing message: the rejection's `message` field when present,
    /// otherwise the error's display text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { body, .. } => match body {
                Value::Object(map) => match map.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    _ => self.to_string(),
                },
                Value::String(text) if !text.trim().is_empty() => text.clone(),
                _ => self.to_string(),
            },
            Self::Transport(_) => self.to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}
