//! Parsing strategy cascade (C5, spec.md §4.5).
//!
//! Orchestrates strict parse → markdown extraction → multi-JSON
//! detection → the fixing state machine → string fallback, producing a
//! single [`Value`] (an `AnyOf` when more than one strategy contributed
//! a candidate). The schema-aware short-circuit — returning the raw
//! input immediately when the target schema is `String` — is not here;
//! it lives in [`crate::parse`], the only place that sees both the
//! input and the schema together.

use std::collections::BTreeSet;

use crate::config::ParseOptions;
use crate::extract;
use crate::fixing;
use crate::value::{json_to_value, Completion, Value};

/// Runs the full cascade over `input`, respecting which strategies
/// `options` allows.
pub fn extract_value(input: &str, options: &ParseOptions) -> Value {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(input) {
        return Value::fixed(json_to_value(&json), BTreeSet::new());
    }

    let mut variants: Vec<Value> = Vec::new();

    if options.allow_markdown_json {
        for fence in extract::find_markdown_fences(input) {
            // Open question (spec.md §9 "Open questions"): whether an
            // empty fenced block should itself become an `AnyOf`
            // variant. We drop it — an empty fence carries no candidate
            // interpretation worth scoring against the schema.
            if fence.content.trim().is_empty() {
                continue;
            }
            let inner = extract_value(&fence.content, options);
            variants.push(Value::Markdown(fence.lang.clone(), Box::new(inner)));
        }
    }

    if options.allow_multi_json {
        let regions = extract::find_balanced_regions(input);
        if regions.len() >= 2 {
            let mut region_values = Vec::with_capacity(regions.len());
            for (start, end) in &regions {
                region_values.push(extract_value(&input[*start..*end], options));
            }
            variants.extend(region_values.iter().cloned());
            variants.push(Value::Array(region_values, Completion::Complete));
        }
    }

    if options.allow_fixing_parser {
        variants.extend(fixing::fix_parse(input));
    }

    if options.allow_string_fallback {
        variants.push(Value::String(input.to_string(), Completion::Complete));
    }

    match variants.len() {
        0 => Value::Null,
        1 => variants.into_iter().next().expect("checked len == 1"),
        _ => Value::any_of(variants, input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn strict_json_short_circuits_before_any_fix_trace() {
        let v = extract_value(r#"{"a":1}"#, &opts());
        assert_eq!(v, Value::Object(
            vec![("a".to_string(), Value::Number(serde_json::Number::from(1), Completion::Complete))],
            Completion::Complete,
        ));
    }

    /// Every candidate Value reachable from `v`: itself if it is not an
    /// `AnyOf`, or each of its variants (one level, not recursive) if it
    /// is — enough to inspect what the cascade offered without assuming
    /// which candidate the coercer would eventually pick.
    fn candidates(v: &Value) -> Vec<&Value> {
        match v {
            Value::AnyOf(variants, _) => variants.iter().collect(),
            other => vec![other],
        }
    }

    #[test]
    fn markdown_fence_contents_go_through_the_full_cascade() {
        let input = "```json\n{'a': 1,}\n```";
        let v = extract_value(input, &opts());
        let found = candidates(&v).into_iter().find_map(|c| {
            let mut fixes = BTreeSet::new();
            let peeled = c.peel(&mut fixes);
            (peeled.kind_name() == "object" && !fixes.is_empty()).then(|| fixes.clone())
        });
        assert!(
            found.is_some(),
            "expected a candidate recovering the fence's object with quote/comma fixes recorded"
        );
    }

    #[test]
    fn two_disjoint_objects_become_any_of_with_synthetic_array() {
        let input = r#"{"k":"v1"} {"k":"v2"}"#;
        let v = extract_value(input, &opts());
        match v {
            Value::AnyOf(variants, _) => {
                assert!(variants.iter().any(|v| matches!(v, Value::Array(items, _) if items.len() == 2)));
            }
            _ => panic!("expected AnyOf"),
        }
    }

    #[test]
    fn disabling_every_strategy_but_fixing_still_yields_a_value() {
        let mut options = opts();
        options.allow_markdown_json = false;
        options.allow_multi_json = false;
        options.allow_string_fallback = false;
        let v = extract_value("{a: 1}", &options);
        let mut fixes = BTreeSet::new();
        assert_eq!(v.peel(&mut fixes).kind_name(), "object");
    }

    #[test]
    fn fully_disabled_cascade_on_unparsable_input_yields_null() {
        let mut options = opts();
        options.allow_markdown_json = false;
        options.allow_multi_json = false;
        options.allow_fixing_parser = false;
        options.allow_string_fallback = false;
        let v = extract_value("not json at all {", &options);
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn prose_embedded_json_is_offered_alongside_surrounding_text() {
        let input = "The result is {\"x\": 3} — done.";
        let v = extract_value(input, &opts());
        match v {
            Value::AnyOf(variants, _) => {
                let mut fixes = BTreeSet::new();
                assert!(variants.iter().any(|v| v.peel(&mut fixes).kind_name() == "object"));
            }
            _ => panic!("expected AnyOf for prose-embedded JSON"),
        }
    }
}
