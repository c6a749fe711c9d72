//! A schema-directed, error-tolerant parser for JSON-like text produced by
//! large language models and other unreliable sources.
//!
//! Given a possibly malformed, truncated, or prose-embedded input and a
//! target [`Schema`], [`parse`] returns a [`TypedValue`] conforming to
//! that schema (or a structured [`ParseError`]), while recording every
//! non-trivial coercion decision it made as a [`flags::Flag`].
//!
//! The pipeline is two layers:
//!
//! 1. [`strategy::extract_value`] turns raw text into a schema-agnostic
//!    [`value::Value`] tree (strict JSON parse, markdown fence
//!    extraction, multi-JSON detection, a tolerant fixing state machine,
//!    and a string fallback).
//! 2. [`coerce::coerce`] recursively projects that tree onto the target
//!    [`Schema`], scoring union options and threading a [`context::Session`]
//!    for caching, cycle detection, and recursion limits.

pub mod coerce;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod fixing;
pub mod flags;
pub mod matcher;
pub mod schema;
pub mod strategy;
pub mod typed_value;
pub mod value;

pub use config::ParseOptions;
pub use error::{ErrorCode, ParseError};
pub use flags::{DeserializerConditions, Flag};
pub use schema::{Field, LazyId, Schema, Severity};
pub use typed_value::TypedValue;
pub use value::{Completion, FixKind, Value};

use context::{ScopePath, Session};

/// Parses `input` against `schema`, applying `options` to the extraction
/// cascade (spec.md §6.1).
///
/// Creates a fresh [`Session`] scoped to this call — no cache, visited
/// set, or lazy-schema resolution survives past the returned result
/// (spec.md §5 "Session-scoped state").
pub fn parse(input: &str, schema: &Schema, options: ParseOptions) -> Result<TypedValue, ParseError> {
    let mut session = Session::new(options);
    let path = ScopePath::root();

    // Short-circuit rule (spec.md §4.5): a String schema consumes the raw
    // input directly, skipping structural extraction entirely.
    if matches!(schema, Schema::String) {
        return Ok(TypedValue::String(input.to_string(), DeserializerConditions::new()));
    }

    let value = strategy::extract_value(input, &session.options.clone());
    coerce::coerce(&mut session, &path, &value, schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_trailing_comma_and_single_quotes() {
        let schema = Schema::Object {
            name: "Pair".into(),
            fields: vec![
                Field::required("a", Schema::Number { integer: true }),
                Field::required("b", Schema::Number { integer: true }),
            ],
        };
        let result = parse("{'a': 1, 'b': 2,}", &schema, ParseOptions::default()).unwrap();
        match result {
            TypedValue::Class { fields, .. } => {
                assert_eq!(fields[0], ("a".to_string(), TypedValue::Int(1, DeserializerConditions::new())));
                assert_eq!(fields[1], ("b".to_string(), TypedValue::Int(2, DeserializerConditions::new())));
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn s2_prose_embedded_json() {
        let schema = Schema::Object {
            name: "Result".into(),
            fields: vec![Field::required("x", Schema::Number { integer: true })],
        };
        let result = parse("The result is {\"x\": 3} — done.", &schema, ParseOptions::default()).unwrap();
        match result {
            TypedValue::Class { fields, .. } => {
                assert_eq!(fields[0].0, "x");
                assert_eq!(fields[0].1, TypedValue::Int(3, DeserializerConditions::new()));
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn s3_multi_object_as_array() {
        let schema = Schema::Array(Box::new(Schema::Object {
            name: "Item".into(),
            fields: vec![Field::required("k", Schema::String)],
        }));
        let result = parse(r#"{"k":"v1"} {"k":"v2"}"#, &schema, ParseOptions::default()).unwrap();
        match result {
            TypedValue::List { items, .. } => {
                assert_eq!(items.len(), 2);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn s7_code_fenced_multiline_string_is_dedented() {
        let schema = Schema::Object {
            name: "Snippet".into(),
            fields: vec![Field::required("code", Schema::String)],
        };
        let input = "{\"code\": ```python\n    def f():\n        return 1\n```}";
        let result = parse(input, &schema, ParseOptions::default()).unwrap();
        match result {
            TypedValue::Class { fields, .. } => {
                assert_eq!(fields[0].0, "code");
                assert_eq!(fields[0].1, TypedValue::String("def f():\n    return 1".to_string(), DeserializerConditions::new()));
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn string_schema_short_circuits_without_structural_parsing() {
        let result = parse("{not even close to json", &Schema::String, ParseOptions::default()).unwrap();
        assert_eq!(result, TypedValue::String("{not even close to json".to_string(), DeserializerConditions::new()));
    }

    #[test]
    fn explain_surfaces_flags_for_a_fuzzy_conversion() {
        let schema = Schema::Number { integer: false };
        let mut session = Session::new(ParseOptions::default());
        let value = strategy::extract_value("\"$1,234.50\"", &session.options.clone());
        let typed = coerce::coerce(&mut session, &ScopePath::root(), &value, &schema).unwrap();
        let explanation = session.explain(&typed);
        assert!(explanation["flags"].as_array().unwrap().iter().any(|f| f["kind"] == "string_to_float"));
    }
}
