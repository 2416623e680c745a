//! Error types for play resolution and catalog enrichment
//!
//! Every internal step returns [`Result`]; the public fail-soft entry points
//! turn these errors into a degraded [`crate::Outcome`] instead of surfacing them.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all filmplay operations
///
/// Implements Display for human-readable messages and Serialize
/// so a frontend bridge can forward it as a plain string.
#[derive(Error, Debug)]
pub enum FilmError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Raw payload could not be parsed
    #[error("Failed to parse: {0}")]
    ParseError(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Requested record or field is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller passed arguments the operation cannot act on
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An external collaborator (rule engine, sniffer, store) reported a failure
    #[error("{stage} failed: {message}")]
    Collaborator { stage: &'static str, message: String },

    /// An external collaborator did not answer in time
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// Analyzer protocol code is neither JSON (1) nor web (0)
    #[error("Unsupported analyzer type: {0}")]
    UnsupportedAnalyzer(i64),

    /// Rate limited by server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,
}

impl FilmError {
    /// Shorthand for wrapping a collaborator failure message
    pub fn collaborator(stage: &'static str, message: impl Into<String>) -> Self {
        FilmError::Collaborator {
            stage,
            message: message.into(),
        }
    }
}

impl Serialize for FilmError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for filmplay operations
pub type Result<T> = std::result::Result<T, FilmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_parse_error() {
        let error = FilmError::ParseError("vod_play_from missing".to_string());
        assert_eq!(error.to_string(), "Failed to parse: vod_play_from missing");
    }

    #[test]
    fn test_error_display_collaborator() {
        let error = FilmError::collaborator("sniffer", "no stream found");
        assert_eq!(error.to_string(), "sniffer failed: no stream found");
    }

    #[test]
    fn test_error_display_timeout() {
        let error = FilmError::Timeout {
            stage: "drpy resolver",
            secs: 60,
        };
        assert_eq!(error.to_string(), "drpy resolver timed out after 60s");
    }

    #[test]
    fn test_error_display_unsupported_analyzer() {
        let error = FilmError::UnsupportedAnalyzer(3);
        assert_eq!(error.to_string(), "Unsupported analyzer type: 3");
    }

    #[test]
    fn test_error_display_invalid_argument() {
        let error = FilmError::InvalidArgument("Delete needs a record id".to_string());
        assert_eq!(error.to_string(), "Invalid argument: Delete needs a record id");
    }

    #[test]
    fn test_error_display_rate_limited() {
        let error = FilmError::RateLimited;
        assert_eq!(error.to_string(), "Rate limited - too many requests");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: FilmError = json_err.into();
        assert!(error.to_string().starts_with("Invalid JSON:"));
    }

    #[test]
    fn test_error_serialize() {
        let error = FilmError::InvalidUrl("not-a-url".to_string());
        let json = serde_json::to_string(&error).expect("Serialization should succeed");
        assert_eq!(json, "\"Invalid URL: not-a-url\"");
    }
}
