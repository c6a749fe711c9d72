//! Configuration for [`crate::parse`].

use serde::{Deserialize, Serialize};

/// Options controlling which strategies [`crate::parse`] is allowed to use
/// and how it handles partial/streaming input. Mirrors spec.md §6.1
/// exactly; field names differ only in Rust's `snake_case` convention.
///
/// ## Serialization format
///
/// Fields are serialized in `kebab-case` (e.g. `max-depth`,
/// `allow-partial`). This is part of the public API contract for any
/// config file or FFI boundary built on top of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ParseOptions {
    /// Enable markdown fence extraction (§4.3). Default: `true`.
    pub allow_markdown_json: bool,
    /// Enable disjoint balanced-region detection (§4.3). Default: `true`.
    pub allow_multi_json: bool,
    /// Enable the tolerant fixing state machine (§4.4). Default: `true`.
    pub allow_fixing_parser: bool,
    /// Return incomplete composites instead of failing when required
    /// fields are not yet present; drop trailing incomplete array
    /// elements (§4.8 "Incompleteness"). Default: `false`.
    pub allow_partial: bool,
    /// Final fallback: wrap raw input as a `String` value when every
    /// other strategy fails (§4.5 step 5). Default: `true`.
    pub allow_string_fallback: bool,
    /// Maximum coercion recursion depth, relative to the active schema
    /// identity (§3.5 invariant 5, §5 "Resource bounds"). Default: `25`.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_markdown_json: true,
            allow_multi_json: true,
            allow_fixing_parser: true,
            allow_partial: false,
            allow_string_fallback: true,
            max_depth: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_section_6_1() {
        let opts = ParseOptions::default();
        assert!(opts.allow_markdown_json);
        assert!(opts.allow_multi_json);
        assert!(opts.allow_fixing_parser);
        assert!(!opts.allow_partial);
        assert!(opts.allow_string_fallback);
        assert_eq!(opts.max_depth, 25);
    }

    #[test]
    fn serde_round_trip_uses_kebab_case() {
        let opts = ParseOptions {
            allow_partial: true,
            max_depth: 10,
            ..ParseOptions::default()
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"allow-partial\":true"));
        assert!(json.contains("\"max-depth\":10"));

        let round_tripped: ParseOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped.allow_partial, true);
        assert_eq!(round_tripped.max_depth, 10);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"{"allow-partial": true}"#;
        let opts: ParseOptions = serde_json::from_str(json).unwrap();
        assert!(opts.allow_partial);
        assert!(opts.allow_markdown_json);
        assert_eq!(opts.max_depth, 25);
    }
}
