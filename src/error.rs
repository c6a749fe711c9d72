//! Error types for the value parser and schema coercer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// These codes form a **stable API contract** — once published, variant names
/// and their serialized `snake_case` strings must never change across
/// versions. Any downstream tooling that renders errors to end users should
/// match on [`ErrorCode`] rather than on [`ParseError`]'s `Display` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// A value did not have the kind the schema required.
    UnexpectedType,
    /// A value was null where the schema required a non-nullable type.
    UnexpectedNull,
    /// A required object field was absent after coercion.
    MissingRequiredField,
    /// A field's value could not be coerced to its declared schema.
    UnparseableField,
    /// A string matcher or enum resolution found more than one candidate.
    TooManyMatches,
    /// No coercion strategy produced a value.
    NoMatch,
    /// A schema/value pair was visited twice during recursive coercion.
    CircularReference,
    /// Recursion depth exceeded [`crate::config::ParseOptions::max_depth`].
    RecursionLimit,
    /// A hard (`assert`) refinement predicate failed.
    ConstraintFailed,
    /// A contract violation internal to the parser itself.
    Internal,
}

/// The error type returned by [`crate::parse`] and the coercion layer.
///
/// Every variant carries a `path` — the [scope path][crate::context::ScopePath]
/// rendered in dot/bracket notation — except [`ParseError::Internal`], which
/// signals a contract violation rather than a data-dependent failure.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("at {path}: expected {expected}, got {got}")]
    UnexpectedType {
        path: String,
        expected: String,
        got: String,
    },

    #[error("at {path}: unexpected null, expected {expected}")]
    UnexpectedNull { path: String, expected: String },

    #[error("at {path}: missing required field `{field}`")]
    MissingRequiredField { path: String, field: String },

    #[error("at {path}: field `{field}` could not be parsed: {source}")]
    UnparseableField {
        path: String,
        field: String,
        #[source]
        source: Box<ParseError>,
    },

    #[error("at {path}: too many matches among {variants:?}")]
    TooManyMatches { path: String, variants: Vec<String> },

    #[error("at {path}: no match")]
    NoMatch { path: String },

    #[error("at {path}: circular reference to schema `{schema_id}`")]
    CircularReference { path: String, schema_id: String },

    #[error("at {path}: recursion limit exceeded (max depth {max_depth})")]
    RecursionLimit { path: String, max_depth: usize },

    #[error("at {path}: constraint failed: {message}")]
    ConstraintFailed { path: String, message: String },

    /// The outermost error surfaced when union resolution (§4.9) exhausts
    /// every option; carries the best-scored (fewest-penalty) sub-error
    /// plus the rest for diagnostics, per spec.md §7 "User-visible failure".
    #[error("at {path}: no union option matched (best attempt: {best})")]
    UnionExhausted {
        path: String,
        best: Box<ParseError>,
        attempts: Vec<(String, ParseError)>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ParseError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ParseError::UnexpectedType { .. } => ErrorCode::UnexpectedType,
            ParseError::UnexpectedNull { .. } => ErrorCode::UnexpectedNull,
            ParseError::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            ParseError::UnparseableField { .. } => ErrorCode::UnparseableField,
            ParseError::TooManyMatches { .. } => ErrorCode::TooManyMatches,
            ParseError::NoMatch { .. } => ErrorCode::NoMatch,
            ParseError::CircularReference { .. } => ErrorCode::CircularReference,
            ParseError::RecursionLimit { .. } => ErrorCode::RecursionLimit,
            ParseError::ConstraintFailed { .. } => ErrorCode::ConstraintFailed,
            ParseError::UnionExhausted { .. } => ErrorCode::NoMatch,
            ParseError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Returns the rendered scope path, if this variant carries one.
    ///
    /// Returns `None` only for [`ParseError::Internal`].
    pub fn path(&self) -> Option<&str> {
        match self {
            ParseError::UnexpectedType { path, .. } => Some(path),
            ParseError::UnexpectedNull { path, .. } => Some(path),
            ParseError::MissingRequiredField { path, .. } => Some(path),
            ParseError::UnparseableField { path, .. } => Some(path),
            ParseError::TooManyMatches { path, .. } => Some(path),
            ParseError::NoMatch { path } => Some(path),
            ParseError::CircularReference { path, .. } => Some(path),
            ParseError::RecursionLimit { path, .. } => Some(path),
            ParseError::ConstraintFailed { path, .. } => Some(path),
            ParseError::UnionExhausted { path, .. } => Some(path),
            ParseError::Internal(_) => None,
        }
    }

    /// A rough, non-negative penalty used to rank sub-errors when union
    /// resolution (§4.9) must pick the "most helpful" failure to surface.
    /// Lower is more specific / more likely to be what the caller meant.
    pub fn helpfulness_rank(&self) -> u32 {
        match self {
            ParseError::UnexpectedNull { .. } => 0,
            ParseError::MissingRequiredField { .. } => 1,
            ParseError::UnexpectedType { .. } => 2,
            ParseError::UnparseableField { .. } => 3,
            ParseError::ConstraintFailed { .. } => 4,
            ParseError::TooManyMatches { .. } => 5,
            ParseError::CircularReference { .. } => 6,
            ParseError::RecursionLimit { .. } => 7,
            ParseError::UnionExhausted { .. } => 8,
            ParseError::NoMatch { .. } => 9,
            ParseError::Internal(_) => 10,
        }
    }

    /// Produces a structured JSON error, e.g. for logging sinks that prefer
    /// structured fields over a formatted string.
    ///
    /// Format: `{"code": "...", "message": "...", "path": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_matches_variant() {
        let err = ParseError::MissingRequiredField {
            path: "$.user.name".to_string(),
            field: "name".to_string(),
        };
        assert_eq!(err.error_code(), ErrorCode::MissingRequiredField);
        assert_eq!(err.path(), Some("$.user.name"));
    }

    #[test]
    fn internal_has_no_path() {
        let err = ParseError::Internal("unreachable".to_string());
        assert_eq!(err.path(), None);
        assert_eq!(err.error_code(), ErrorCode::Internal);
    }

    #[test]
    fn to_json_has_stable_shape() {
        let err = ParseError::NoMatch {
            path: "$".to_string(),
        };
        let json = err.to_json();
        assert_eq!(json["code"], serde_json::json!("no_match"));
        assert_eq!(json["path"], serde_json::json!("$"));
    }

    #[test]
    fn helpfulness_prefers_specific_errors() {
        let missing = ParseError::MissingRequiredField {
            path: "$".into(),
            field: "x".into(),
        };
        let no_match = ParseError::NoMatch { path: "$".into() };
        assert!(missing.helpfulness_rank() < no_match.helpfulness_rank());
    }
}
