//! Fail-soft result type for UI-facing entry points
//!
//! A degraded value is still well shaped and renderable, but callers can tell
//! it apart from a genuine success.

use serde::Serialize;

use crate::error::FilmError;

/// Either the normal payload or a default-shaped payload plus the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome<T> {
    Complete { value: T },
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn complete(value: T) -> Self {
        Outcome::Complete { value }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Outcome::Degraded {
            value,
            reason: reason.into(),
        }
    }

    /// Build from a fallible computation, substituting `fallback` on error
    pub fn from_result(result: Result<T, FilmError>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(value) => Outcome::complete(value),
            Err(e) => Outcome::degraded(fallback(), e.to_string()),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete { value } | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Complete { value } | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Complete { .. } => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result_ok() {
        let outcome = Outcome::from_result(Ok(3), || 0);
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.into_inner(), 3);
    }

    #[test]
    fn test_from_result_err_uses_fallback() {
        let outcome: Outcome<Vec<u8>> =
            Outcome::from_result(Err(FilmError::NotFound("x".to_string())), Vec::new);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.reason(), Some("Not found: x"));
        assert!(outcome.value().is_empty());
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(Outcome::degraded(1, "boom")).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["value"], 1);
        assert_eq!(json["reason"], "boom");
    }
}
