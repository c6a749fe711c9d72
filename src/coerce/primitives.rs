//! Primitive coercers (C7, spec.md §4.7).
//!
//! Each function takes a peeled structural [`Value`] and produces a
//! [`TypedValue`] or a [`ParseError`], adding whatever flags the
//! conversion required. None of these recurse into `coerce::coerce` except
//! where a single-element array needs to be unwrapped to a scalar.

use regex::Regex;

use crate::context::ScopePath;
use crate::error::ParseError;
use crate::flags::{DeserializerConditions, Flag};
use crate::matcher::{self, MatchFlag, MatchOutcome};
use crate::typed_value::TypedValue;
use crate::value::{Completion, Value};

/// If `value` is an `Array`, returns its first element and whether more
/// than one was present (spec.md §4.8 "Array-to-single"). `None` for an
/// empty array or a non-array value.
pub fn first_of_array(value: &Value) -> Option<(&Value, bool)> {
    match value {
        Value::Array(items, _) if !items.is_empty() => Some((&items[0], items.len() > 1)),
        _ => None,
    }
}

fn incomplete_flag(completion: Completion) -> DeserializerConditions {
    let mut flags = DeserializerConditions::new();
    if !completion.is_complete() {
        flags.add(Flag::Incomplete);
    }
    flags
}

pub fn coerce_string(path: &ScopePath, value: &Value) -> Result<TypedValue, ParseError> {
    match value {
        Value::String(s, completion) => Ok(TypedValue::String(s.clone(), incomplete_flag(*completion))),
        Value::Number(n, completion) => {
            let mut flags = incomplete_flag(*completion);
            flags.add(Flag::JsonToString);
            Ok(TypedValue::String(n.to_string(), flags))
        }
        Value::Bool(b) => {
            let mut flags = DeserializerConditions::new();
            flags.add(Flag::JsonToString);
            Ok(TypedValue::String(b.to_string(), flags))
        }
        Value::Null => {
            let mut flags = DeserializerConditions::new();
            flags.add(Flag::JsonToString);
            Ok(TypedValue::String("null".to_string(), flags))
        }
        Value::Object(_, completion) => {
            let mut flags = incomplete_flag(*completion);
            flags.add(Flag::ObjectToString);
            Ok(TypedValue::String(value.to_plain().to_string(), flags))
        }
        Value::Array(items, _) if !items.is_empty() => {
            let (first, had_more) = first_of_array(value).expect("non-empty array");
            let mut typed = coerce_string(path, first)?;
            if had_more {
                typed.flags_mut().add(Flag::FirstOfMultiple);
            }
            Ok(typed)
        }
        other => Err(ParseError::UnexpectedType {
            path: path.render(),
            expected: "string".to_string(),
            got: other.kind_name().to_string(),
        }),
    }
}

pub fn coerce_number(path: &ScopePath, integer: bool, value: &Value) -> Result<TypedValue, ParseError> {
    match value {
        Value::Number(n, completion) => {
            let flags = incomplete_flag(*completion);
            if integer && n.is_i64() {
                // Exact integer path — avoids routing large i64s through
                // f64 and losing precision beyond 2^53.
                Ok(TypedValue::Int(n.as_i64().expect("checked is_i64"), flags))
            } else if !integer && n.is_f64() {
                Ok(TypedValue::Float(n.as_f64().expect("checked is_f64"), flags))
            } else {
                Ok(number_to_typed(n.as_f64().unwrap_or(0.0), integer, flags))
            }
        }
        Value::String(s, completion) => {
            let parsed = parse_tolerant_number(s).ok_or_else(|| ParseError::UnexpectedType {
                path: path.render(),
                expected: if integer { "int" } else { "float" }.to_string(),
                got: "string".to_string(),
            })?;
            let mut flags = incomplete_flag(*completion);
            flags.add(Flag::StringToFloat);
            Ok(number_to_typed(parsed, integer, flags))
        }
        Value::Array(items, _) if !items.is_empty() => {
            let (first, had_more) = first_of_array(value).expect("non-empty array");
            let mut typed = coerce_number(path, integer, first)?;
            if had_more {
                typed.flags_mut().add(Flag::FirstOfMultiple);
            }
            Ok(typed)
        }
        other => Err(ParseError::UnexpectedType {
            path: path.render(),
            expected: if integer { "int" } else { "float" }.to_string(),
            got: other.kind_name().to_string(),
        }),
    }
}

fn number_to_typed(n: f64, integer: bool, mut flags: DeserializerConditions) -> TypedValue {
    if integer {
        let rounded = n.round();
        if (rounded - n).abs() > f64::EPSILON {
            flags.add(Flag::FloatToInt);
        }
        TypedValue::Int(rounded as i64, flags)
    } else {
        TypedValue::Float(n, flags)
    }
}

/// Tolerant numeric grammar (spec.md §4.7): currency prefix, digit-group
/// commas, `a/b` fractions, scientific notation — tried in order, the
/// full (trimmed) string must be consumed by whichever form matches.
fn parse_tolerant_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let cleaned = s.strip_prefix('$').unwrap_or(s).replace(',', "");
    if let Ok(v) = cleaned.parse::<f64>() {
        return Some(v);
    }

    if let Some((num, den)) = cleaned.split_once('/') {
        if let (Ok(n), Ok(d)) = (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            if d != 0.0 {
                return Some(n / d);
            }
        }
    }

    None
}

pub fn coerce_bool(path: &ScopePath, value: &Value) -> Result<TypedValue, ParseError> {
    match value {
        Value::Bool(b) => Ok(TypedValue::Bool(*b, DeserializerConditions::new())),
        Value::String(s, _) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                return Ok(bool_typed(true));
            }
            if trimmed.eq_ignore_ascii_case("false") {
                return Ok(bool_typed(false));
            }

            let true_hit = whole_word(s, "true");
            let false_hit = whole_word(s, "false");
            match (true_hit, false_hit) {
                (true, true) => Err(ParseError::TooManyMatches {
                    path: path.render(),
                    variants: vec!["true".to_string(), "false".to_string()],
                }),
                (true, false) => Ok(bool_typed(true)),
                (false, true) => Ok(bool_typed(false)),
                (false, false) => {
                    const TRUE_SYNONYMS: &[&str] = &["yes", "y", "1", "on", "enabled"];
                    const FALSE_SYNONYMS: &[&str] = &["no", "n", "0", "off", "disabled"];
                    let true_syn = TRUE_SYNONYMS.iter().any(|w| whole_word(s, w));
                    let false_syn = FALSE_SYNONYMS.iter().any(|w| whole_word(s, w));
                    match (true_syn, false_syn) {
                        (true, false) => Ok(bool_typed(true)),
                        (false, true) => Ok(bool_typed(false)),
                        _ => Err(ParseError::NoMatch { path: path.render() }),
                    }
                }
            }
        }
        Value::Array(items, _) if !items.is_empty() => {
            let (first, had_more) = first_of_array(value).expect("non-empty array");
            let mut typed = coerce_bool(path, first)?;
            if had_more {
                typed.flags_mut().add(Flag::FirstOfMultiple);
            }
            Ok(typed)
        }
        other => Err(ParseError::UnexpectedType {
            path: path.render(),
            expected: "bool".to_string(),
            got: other.kind_name().to_string(),
        }),
    }
}

fn bool_typed(b: bool) -> TypedValue {
    let mut flags = DeserializerConditions::new();
    flags.add(Flag::StringToBool);
    TypedValue::Bool(b, flags)
}

fn whole_word(haystack: &str, word: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    Regex::new(&pattern).map(|re| re.is_match(haystack)).unwrap_or(false)
}

pub fn coerce_null(path: &ScopePath, value: &Value) -> Result<TypedValue, ParseError> {
    match value {
        Value::Null => Ok(TypedValue::Null(DeserializerConditions::new())),
        other => Err(ParseError::UnexpectedNull {
            path: path.render(),
            expected: other.kind_name().to_string(),
        }),
    }
}

pub fn coerce_enum(
    path: &ScopePath,
    name: &str,
    variants: &[String],
    value: &Value,
) -> Result<TypedValue, ParseError> {
    let query = match value {
        Value::String(s, _) => s.clone(),
        Value::Number(n, _) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items, _) if !items.is_empty() => {
            let (first, had_more) = first_of_array(value).expect("non-empty array");
            let mut typed = coerce_enum(path, name, variants, first)?;
            if had_more {
                typed.flags_mut().add(Flag::FirstOfMultiple);
            }
            return Ok(typed);
        }
        other => {
            return Err(ParseError::UnexpectedType {
                path: path.render(),
                expected: format!("enum {name}"),
                got: other.kind_name().to_string(),
            })
        }
    };

    match matcher::match_string(&query, variants) {
        MatchOutcome::Match { index, flag } => {
            let mut flags = DeserializerConditions::new();
            match flag {
                MatchFlag::Exact => {}
                MatchFlag::Substring => flags.add(Flag::SubstringMatch { matched: variants[index].clone() }),
                MatchFlag::OneFromMany(candidates) => flags.add(Flag::StrMatchOneFromMany { candidates }),
            }
            Ok(TypedValue::Enum {
                name: name.to_string(),
                variant: variants[index].clone(),
                flags,
            })
        }
        MatchOutcome::Ambiguous(candidates) => Err(ParseError::TooManyMatches {
            path: path.render(),
            variants: candidates,
        }),
        MatchOutcome::NoMatch => Err(ParseError::NoMatch { path: path.render() }),
    }
}

pub fn coerce_literal(path: &ScopePath, literal: &serde_json::Value, value: &Value) -> Result<TypedValue, ParseError> {
    match literal {
        serde_json::Value::String(expected) => {
            let candidates = vec![expected.clone()];
            let query = match value {
                Value::String(s, _) => s.clone(),
                Value::Number(n, _) => n.to_string(),
                other => {
                    return Err(ParseError::UnexpectedType {
                        path: path.render(),
                        expected: format!("literal {expected:?}"),
                        got: other.kind_name().to_string(),
                    })
                }
            };
            match matcher::match_string(&query, &candidates) {
                MatchOutcome::Match { flag, .. } => {
                    let mut flags = DeserializerConditions::new();
                    match flag {
                        MatchFlag::Exact => {}
                        MatchFlag::Substring => flags.add(Flag::SubstringMatch { matched: expected.clone() }),
                        MatchFlag::OneFromMany(c) => flags.add(Flag::StrMatchOneFromMany { candidates: c }),
                    }
                    Ok(TypedValue::Literal(literal.clone(), flags))
                }
                MatchOutcome::Ambiguous(v) => Err(ParseError::TooManyMatches { path: path.render(), variants: v }),
                MatchOutcome::NoMatch => Err(ParseError::NoMatch { path: path.render() }),
            }
        }
        serde_json::Value::Bool(expected) => {
            let typed = coerce_bool(path, value)?;
            match &typed {
                TypedValue::Bool(b, _) if b == expected => Ok(TypedValue::Literal(literal.clone(), typed.flags().clone())),
                _ => Err(ParseError::NoMatch { path: path.render() }),
            }
        }
        serde_json::Value::Number(expected) => {
            let integer = expected.is_i64() || expected.is_u64();
            let typed = coerce_number(path, integer, value)?;
            let matches = match &typed {
                TypedValue::Int(i, _) => expected.as_i64() == Some(*i),
                TypedValue::Float(f, _) => expected.as_f64() == Some(*f),
                _ => false,
            };
            if matches {
                Ok(TypedValue::Literal(literal.clone(), typed.flags().clone()))
            } else {
                Err(ParseError::NoMatch { path: path.render() })
            }
        }
        serde_json::Value::Null => coerce_null(path, value).map(|_| TypedValue::Literal(serde_json::Value::Null, DeserializerConditions::new())),
        other => Err(ParseError::Internal(format!("unsupported literal kind: {other:?}"))),
    }
}
