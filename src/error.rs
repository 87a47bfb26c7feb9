// src/error.rs

//! Unified error handling for the court crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Login against the portal failed; aborts the run
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Upstream call failed (non-2xx, timeout, connection)
    #[error("Transport error for {context}: {message}")]
    Transport { context: String, message: String },

    /// Upstream answered but the body could not be understood
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// Circuit breaker denied the call locally
    #[error("Circuit open: call to {0} skipped")]
    CircuitOpen(String),

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

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a transport error with context.
    pub fn transport(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error must stop the whole run rather than a single date.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_is_fatal() {
        assert!(AppError::auth("bad password").is_fatal());
        assert!(!AppError::transport("2026-03-01", "timeout").is_fatal());
        assert!(!AppError::parse("2026-03-01", "not json").is_fatal());
        assert!(!AppError::CircuitOpen("FAC01".into()).is_fatal());
    }

    #[test]
    fn transport_message_includes_context() {
        let err = AppError::transport("FAC01 2026-03-01", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "Transport error for FAC01 2026-03-01: HTTP 503"
        );
    }
}
