//! Composite coercers (C8, spec.md §4.8): arrays, maps/records, objects.
//!
//! Each composite coercer calls back into [`crate::coerce::coerce`] for
//! its children, threading the session (for recursion/cycle bookkeeping)
//! and an extended [`ScopePath`].

use crate::coerce::coerce;
use crate::context::{ScopePath, Session};
use crate::error::ParseError;
use crate::flags::{DeserializerConditions, Flag};
use crate::schema::{Field, Schema};
use crate::typed_value::TypedValue;
use crate::value::{Completion, Value};

pub fn coerce_array(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    element: &Schema,
) -> Result<TypedValue, ParseError> {
    match value {
        Value::Array(items, completion) => {
            // Streaming rule (spec.md §4.8 "Incompleteness", gated by
            // §6.1's `allowPartial`): never surface a half-built trailing
            // element when the caller opted into partial/streaming
            // semantics. Without `allow_partial`, a truncated trailing
            // element is left in place and coerced normally, surfacing as
            // an ordinary `ArrayItemParseError` if it doesn't parse clean.
            let usable: &[Value] = if session.options.allow_partial
                && !completion.is_complete()
                && items.last().map(|i| !i.completion().is_complete()).unwrap_or(false)
            {
                &items[..items.len() - 1]
            } else {
                &items[..]
            };

            let mut out = Vec::new();
            let mut flags = DeserializerConditions::new();
            let mut first_error: Option<ParseError> = None;
            for (i, item) in usable.iter().enumerate() {
                match coerce(session, &path.index(i), item, element) {
                    Ok(typed) => out.push(typed),
                    Err(err) => {
                        tracing::debug!(path = %path.index(i).render(), error = %err, "array item dropped");
                        if first_error.is_none() {
                            first_error = Some(err.clone());
                        }
                        flags.add(Flag::ArrayItemParseError { index: i, error: err.to_string() });
                    }
                }
            }

            if !usable.is_empty() && out.is_empty() {
                return Err(first_error.unwrap_or(ParseError::NoMatch { path: path.render() }));
            }

            if !completion.is_complete() {
                flags.add(Flag::Incomplete);
            }

            Ok(TypedValue::List { items: out, flags })
        }
        other => {
            let typed = coerce(session, &path.index(0), other, element)?;
            let mut flags = DeserializerConditions::new();
            flags.add(Flag::SingleToArray);
            Ok(TypedValue::List { items: vec![typed], flags })
        }
    }
}

pub fn coerce_map(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    key_schema: &Schema,
    value_schema: &Schema,
) -> Result<TypedValue, ParseError> {
    match value {
        Value::Object(entries, completion) => {
            build_map(session, path, entries, *completion, key_schema, value_schema, DeserializerConditions::new())
        }
        Value::Array(items, completion) if items.iter().all(is_key_value_pair) && !items.is_empty() => {
            let entries: Vec<(String, Value)> = items
                .iter()
                .map(|item| match item {
                    Value::Object(fields, _) => {
                        let key = fields.iter().find(|(k, _)| k == "key").map(|(_, v)| v.clone());
                        let val = fields.iter().find(|(k, _)| k == "value").map(|(_, v)| v.clone());
                        let key_str = match key {
                            Some(Value::String(s, _)) => s,
                            Some(other) => other.to_plain().to_string(),
                            None => String::new(),
                        };
                        (key_str, val.unwrap_or(Value::Null))
                    }
                    _ => unreachable!("filtered by is_key_value_pair"),
                })
                .collect();
            let mut flags = DeserializerConditions::new();
            flags.add(Flag::ObjectToMap);
            build_map(session, path, &entries, *completion, key_schema, value_schema, flags)
        }
        other => Err(ParseError::UnexpectedType {
            path: path.render(),
            expected: "map".to_string(),
            got: other.kind_name().to_string(),
        }),
    }
}

fn is_key_value_pair(v: &Value) -> bool {
    matches!(v, Value::Object(fields, _) if fields.iter().any(|(k, _)| k == "key") && fields.iter().any(|(k, _)| k == "value"))
}

fn build_map(
    session: &mut Session,
    path: &ScopePath,
    entries: &[(String, Value)],
    completion: Completion,
    key_schema: &Schema,
    value_schema: &Schema,
    mut flags: DeserializerConditions,
) -> Result<TypedValue, ParseError> {
    // Duplicate keys: last coerced value wins, preserving first occurrence's
    // position (spec.md §4.8 "record no special flag").
    let mut order: Vec<String> = Vec::new();
    let mut by_key: std::collections::HashMap<String, TypedValue> = std::collections::HashMap::new();

    for (k, v) in entries {
        let key_value = Value::String(k.clone(), Completion::Complete);
        let key_typed = coerce(session, &path.field(k), &key_value, key_schema)?;
        let key_string = match key_typed.to_plain() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        match coerce(session, &path.field(k), v, value_schema) {
            Ok(typed) => {
                if !by_key.contains_key(&key_string) {
                    order.push(key_string.clone());
                }
                by_key.insert(key_string, typed);
            }
            Err(err) => {
                tracing::debug!(path = %path.field(k).render(), error = %err, "map entry dropped");
                flags.add(Flag::MapValueParseError { key: k.clone(), error: err.to_string() });
            }
        }
    }

    if !completion.is_complete() {
        flags.add(Flag::Incomplete);
    }

    let entries = order
        .into_iter()
        .map(|k| {
            let v = by_key.remove(&k).expect("key came from by_key");
            (k, v)
        })
        .collect();

    Ok(TypedValue::Map { entries, flags })
}

pub fn coerce_object(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    name: &str,
    fields: &[Field],
) -> Result<TypedValue, ParseError> {
    match value {
        Value::Object(entries, completion) => coerce_object_entries(session, path, entries, *completion, name, fields),
        Value::String(s, _) => match serde_json::from_str::<serde_json::Value>(s) {
            Ok(json) => {
                let reparsed = crate::value::json_to_value(&json);
                coerce_object(session, path, &reparsed, name, fields)
            }
            Err(_) => Err(ParseError::UnexpectedType {
                path: path.render(),
                expected: format!("object {name}"),
                got: "string".to_string(),
            }),
        },
        other => Err(ParseError::UnexpectedType {
            path: path.render(),
            expected: format!("object {name}"),
            got: other.kind_name().to_string(),
        }),
    }
}

fn coerce_object_entries(
    session: &mut Session,
    path: &ScopePath,
    entries: &[(String, Value)],
    completion: Completion,
    name: &str,
    fields: &[Field],
) -> Result<TypedValue, ParseError> {
    let mut consumed = vec![false; entries.len()];
    let mut out_fields = Vec::with_capacity(fields.len());
    let mut flags = DeserializerConditions::new();
    let incomplete_input = !completion.is_complete();

    for field in fields {
        // Case-sensitive match wins; fall back to case-insensitive only on
        // a sensitive-match miss (spec.md §4.8 "Object / Class").
        let exact = entries.iter().enumerate().rev().find(|(i, (k, _))| !consumed[*i] && k == &field.name);
        let found = exact.or_else(|| {
            entries
                .iter()
                .enumerate()
                .rev()
                .find(|(i, (k, _))| !consumed[*i] && k.eq_ignore_ascii_case(&field.name))
        });

        match found {
            Some((idx, (_, entry_value))) => {
                consumed[idx] = true;
                let typed = coerce(session, &path.field(&field.name), entry_value, &field.schema)?;
                out_fields.push((field.name.clone(), typed));
            }
            None if field.required => {
                // §6.1 `allowPartial`: only a caller that opted into
                // partial/streaming semantics gets a best-effort object
                // back when a required field never arrived; otherwise a
                // required field missing from truncated input fails the
                // same way it would from a complete-but-wrong input.
                if incomplete_input && session.options.allow_partial {
                    flags.add(Flag::Incomplete);
                    continue;
                }
                return Err(ParseError::MissingRequiredField {
                    path: path.render(),
                    field: field.name.clone(),
                });
            }
            None => {
                if let Some(default_json) = field.schema.default_value() {
                    let default_value = crate::value::json_to_value(default_json);
                    let mut typed = coerce(session, &path.field(&field.name), &default_value, field.schema.innermost())
                        .unwrap_or(TypedValue::Null(DeserializerConditions::new()));
                    typed.flags_mut().add(Flag::DefaultFromNoValue);
                    out_fields.push((field.name.clone(), typed));
                } else if field.schema.is_nullable() {
                    let mut null_flags = DeserializerConditions::new();
                    null_flags.add(Flag::DefaultFromNoValue);
                    out_fields.push((field.name.clone(), TypedValue::Null(null_flags)));
                }
                // Optional field with neither default nor nullable wrapper:
                // nothing to fill in, simply omit it.
            }
        }
    }

    for (i, (key, entry_value)) in entries.iter().enumerate() {
        if !consumed[i] {
            flags.add(Flag::ExtraKey { key: key.clone(), value: entry_value.to_plain() });
        }
    }

    if incomplete_input {
        flags.add(Flag::Incomplete);
    }

    Ok(TypedValue::Class { name: name.to_string(), fields: out_fields, flags })
}
