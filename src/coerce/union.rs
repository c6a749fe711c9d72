//! Union coercer & scorer (C9, spec.md §4.9).
//!
//! Two-phase resolution: a "direct cast" pass (realized here as the full
//! coercer filtered to zero-score results — see the module-level note
//! below) followed by a full-coercion pass scored by [`TypedValue::total_score`]
//! with the tie-break chain from spec.md §4.9.

use crate::coerce::coerce;
use crate::context::{schema_fingerprint, value_fingerprint, ScopePath, Session};
use crate::error::ParseError;
use crate::schema::Schema;
use crate::typed_value::TypedValue;
use crate::value::Value;

/// Phase A ("direct cast") is specified as: try each option with a coercer
/// that only succeeds on an exact-kind, flag-free match. Rather than carry
/// a second, parallel strict-only coercer, we reuse the full coercer and
/// treat a zero [`TypedValue::total_score`] result as a direct cast — a
/// flag-free coercion *is* by definition the exact, no-conversion match
/// the spec describes (§4.2's penalty table assigns every non-exact
/// conversion a nonzero penalty), so the two are equivalent outcomes
/// reached via one code path instead of two.
fn is_direct_cast(typed: &TypedValue) -> bool {
    typed.total_score() == 0
}

/// Value-level fan-out: an `AnyOf` contributes each of its variants as a
/// candidate value; any other value contributes itself alone (spec.md
/// §4.9 "AnyOf interaction").
fn value_variants(value: &Value) -> Vec<&Value> {
    let mut fixes = std::collections::BTreeSet::new();
    match value.peel(&mut fixes) {
        Value::AnyOf(variants, _) => variants.iter().collect(),
        _ => vec![value],
    }
}

struct Candidate {
    option_index: usize,
    value_index: usize,
    typed: TypedValue,
}

pub fn coerce_union(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    options: &[Schema],
) -> Result<TypedValue, ParseError> {
    let schema_fp = schema_fingerprint(&Schema::Union(options.to_vec()));
    let value_fp = value_fingerprint(value);
    if let Some(cached) = session.cached(&schema_fp, &value_fp) {
        tracing::debug!(path = %path.render(), "union result served from session cache");
        return cached.clone();
    }

    let variants = value_variants(value);

    let mut direct_hits: Vec<Candidate> = Vec::new();
    let mut all_attempts: Vec<(usize, usize, Result<TypedValue, ParseError>)> = Vec::new();

    for (vi, v) in variants.iter().enumerate() {
        for (oi, opt) in options.iter().enumerate() {
            let result = coerce(session, path, v, opt);
            if let Ok(typed) = &result {
                if is_direct_cast(typed) {
                    direct_hits.push(Candidate { option_index: oi, value_index: vi, typed: typed.clone() });
                }
            }
            all_attempts.push((vi, oi, result));
        }
    }

    let result = if !direct_hits.is_empty() {
        Ok(select_best(direct_hits))
    } else {
        let successes: Vec<Candidate> = all_attempts
            .iter()
            .filter_map(|(vi, oi, r)| {
                r.as_ref().ok().map(|t| Candidate { option_index: *oi, value_index: *vi, typed: t.clone() })
            })
            .collect();

        if successes.is_empty() {
            let mut errors: Vec<ParseError> =
                all_attempts.into_iter().filter_map(|(_, _, r)| r.err()).collect();
            errors.sort_by_key(ParseError::helpfulness_rank);
            let best = errors.remove(0);
            tracing::warn!(path = %path.render(), "no union option matched");
            Err(ParseError::UnionExhausted {
                path: path.render(),
                best: Box::new(best.clone()),
                attempts: errors.into_iter().map(|e| (format!("{:?}", e.error_code()), e)).collect(),
            })
        } else {
            Ok(select_best(successes))
        }
    };

    session.cache(schema_fp, value_fp, result.clone());
    result
}

/// Applies the spec.md §4.9 selection rules: lowest penalty sum, then
/// fewer array/map item errors, then fewer defaulted/extra fields, then
/// earliest declared option.
fn select_best(mut candidates: Vec<Candidate>) -> TypedValue {
    candidates.sort_by(|a, b| {
        a.typed
            .total_score()
            .cmp(&b.typed.total_score())
            .then_with(|| count_flag_recursive(&a.typed, parse_error_flags).cmp(&count_flag_recursive(&b.typed, parse_error_flags)))
            .then_with(|| count_flag_recursive(&a.typed, defaulted_flags).cmp(&count_flag_recursive(&b.typed, defaulted_flags)))
            .then_with(|| a.option_index.cmp(&b.option_index))
            .then_with(|| a.value_index.cmp(&b.value_index))
    });
    candidates.into_iter().next().expect("caller guarantees non-empty").typed
}

fn parse_error_flags(kind: &str) -> bool {
    matches!(kind, "array_item_parse_error" | "map_value_parse_error")
}

fn defaulted_flags(kind: &str) -> bool {
    matches!(kind, "default_from_no_value" | "extra_key")
}

fn count_flag_recursive(typed: &TypedValue, predicate: fn(&str) -> bool) -> usize {
    let own = typed.flags().iter().filter(|f| predicate(f.kind_name())).count();
    let children: usize = match typed {
        TypedValue::List { items, .. } => items.iter().map(|t| count_flag_recursive(t, predicate)).sum(),
        TypedValue::Map { entries, .. } => entries.iter().map(|(_, t)| count_flag_recursive(t, predicate)).sum(),
        TypedValue::Class { fields, .. } => fields.iter().map(|(_, t)| count_flag_recursive(t, predicate)).sum(),
        _ => 0,
    };
    own + children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::value::Completion;

    fn session() -> Session {
        Session::new(ParseOptions::default())
    }

    #[test]
    fn exact_number_range_picks_matching_option_s6() {
        let mut s = session();
        let low = Schema::Object {
            name: "Low".into(),
            fields: vec![crate::schema::Field::required("bar", Schema::Number { integer: true })],
        };
        let high = Schema::Object {
            name: "High".into(),
            fields: vec![crate::schema::Field::required("bar", Schema::Number { integer: true })],
        };
        let value = Value::Object(
            vec![("bar".to_string(), Value::Number(serde_json::Number::from(5), Completion::Complete))],
            Completion::Complete,
        );
        let typed = coerce_union(&mut s, &ScopePath::root(), &value, &[low, high]).unwrap();
        match typed {
            TypedValue::Class { name, .. } => assert_eq!(name, "Low"),
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn union_is_deterministic_across_runs() {
        let mut s1 = session();
        let mut s2 = session();
        let value = Value::String("42".into(), Completion::Complete);
        let options = vec![Schema::Number { integer: true }, Schema::String];
        let a = coerce_union(&mut s1, &ScopePath::root(), &value, &options).unwrap();
        let b = coerce_union(&mut s2, &ScopePath::root(), &value, &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn prefers_exact_type_over_flag_producing_conversion() {
        let mut s = session();
        let value = Value::Number(serde_json::Number::from(5), Completion::Complete);
        let options = vec![Schema::String, Schema::Number { integer: true }];
        let typed = coerce_union(&mut s, &ScopePath::root(), &value, &options).unwrap();
        assert!(matches!(typed, TypedValue::Int(5, _)));
    }
}
