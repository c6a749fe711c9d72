//! Schema-directed coercion: the recursive projection of a [`Value`] tree
//! onto a target [`Schema`] (spec.md §4, components C7–C9).
//!
//! [`coerce`] is the single recursive entry point every composite
//! coercer and the union coercer calls back into for its children —
//! that makes it the natural place to enforce the recursion-depth bound
//! (spec.md §3.5 invariant 5) and to fan out an `AnyOf` value against a
//! non-union schema (spec.md §4.9 "AnyOf interaction", generalized here
//! to apply whenever an `AnyOf` reaches any schema kind, not just
//! `Union`).

pub mod composite;
pub mod primitives;
pub mod union;

use std::collections::BTreeSet;

use crate::context::{ScopePath, Session};
use crate::error::ParseError;
use crate::flags::Flag;
use crate::schema::{Schema, Severity};
use crate::typed_value::TypedValue;
use crate::value::Value;

pub fn coerce(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    schema: &Schema,
) -> Result<TypedValue, ParseError> {
    session.enter_depth(path)?;
    let result = coerce_inner(session, path, value, schema);
    session.exit_depth();
    result
}

fn coerce_inner(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    schema: &Schema,
) -> Result<TypedValue, ParseError> {
    match schema {
        Schema::Lazy { id, thunk } => {
            let resolved = session.resolve_lazy(*id, thunk);
            let schema_id = id.to_string();
            let value_fp = crate::context::value_fingerprint(value);
            session.with_recursion(schema_id, value_fp, path, |session| {
                coerce(session, path, value, &resolved)
            })
        }
        Schema::Refined { inner, predicate, message, severity } => {
            let mut typed = coerce(session, path, value, inner)?;
            if !predicate(&typed) {
                match severity {
                    Severity::Assert => {
                        return Err(ParseError::ConstraintFailed {
                            path: path.render(),
                            message: message.clone(),
                        });
                    }
                    Severity::Check => {
                        typed.flags_mut().add(Flag::ConstraintWarning { message: message.clone() });
                    }
                }
            }
            Ok(typed)
        }
        Schema::Union(options) => union::coerce_union(session, path, value, options),
        _ => {
            let mut fixes = BTreeSet::new();
            if let Value::AnyOf(variants, _) = value.peel(&mut fixes) {
                return resolve_any_of(session, path, variants, schema);
            }
            coerce_structural(session, path, value, schema)
        }
    }
}

/// Generalized `AnyOf` fan-out for a non-`Union` schema: coerce every
/// variant against the same schema and keep the best-scoring success
/// (spec.md §4.3 "tie-break policy for AnyOf" — ties resolved by
/// encounter order).
fn resolve_any_of(
    session: &mut Session,
    path: &ScopePath,
    variants: &[Value],
    schema: &Schema,
) -> Result<TypedValue, ParseError> {
    let mut best: Option<TypedValue> = None;
    let mut best_error: Option<ParseError> = None;
    for variant in variants {
        match coerce(session, path, variant, schema) {
            Ok(typed) => {
                let better = best
                    .as_ref()
                    .map(|b| typed.total_score() < b.total_score())
                    .unwrap_or(true);
                if better {
                    best = Some(typed);
                }
            }
            Err(err) => {
                if best_error.is_none() {
                    best_error = Some(err);
                }
            }
        }
    }
    best.ok_or_else(|| best_error.unwrap_or(ParseError::NoMatch { path: path.render() }))
}

fn coerce_structural(
    session: &mut Session,
    path: &ScopePath,
    value: &Value,
    schema: &Schema,
) -> Result<TypedValue, ParseError> {
    let mut fixes = BTreeSet::new();
    let peeled = value.peel(&mut fixes);

    match schema {
        Schema::String => primitives::coerce_string(path, peeled),
        Schema::Number { integer } => primitives::coerce_number(path, *integer, peeled),
        Schema::Bool => primitives::coerce_bool(path, peeled),
        Schema::Null => primitives::coerce_null(path, peeled),
        Schema::Literal(lit) => primitives::coerce_literal(path, lit, peeled),
        Schema::Enum { name, variants } => primitives::coerce_enum(path, name, variants, peeled),
        Schema::Array(element) => composite::coerce_array(session, path, peeled, element),
        Schema::Map { key, value: value_schema } => composite::coerce_map(session, path, peeled, key, value_schema),
        Schema::Object { name, fields } => composite::coerce_object(session, path, peeled, name, fields),
        Schema::Optional(inner) | Schema::Nullable(inner) => coerce_nullable(session, path, peeled, inner),
        Schema::Default(inner, default_json) => coerce_default(session, path, value, peeled, inner, default_json),
        Schema::Lazy { .. } | Schema::Refined { .. } | Schema::Union(_) => {
            unreachable!("handled by coerce_inner before reaching coerce_structural")
        }
    }
}

fn coerce_nullable(
    session: &mut Session,
    path: &ScopePath,
    peeled: &Value,
    inner: &Schema,
) -> Result<TypedValue, ParseError> {
    if matches!(peeled, Value::Null) {
        return Ok(TypedValue::Null(crate::flags::DeserializerConditions::new()));
    }
    coerce(session, path, peeled, inner)
}

/// A present value that fails to coerce to the declared inner type falls
/// back to the schema's default rather than failing the whole parse,
/// flagged `DefaultButHadValue` — a loud (penalty 100) signal that this
/// branch should lose any union tie-break (spec.md §4.7 "Null" section,
/// resolved per `DESIGN.md`: the flag belongs to `Default`'s fallback
/// path, not literal `Null` coercion).
fn coerce_default(
    session: &mut Session,
    path: &ScopePath,
    original: &Value,
    peeled: &Value,
    inner: &Schema,
    default_json: &serde_json::Value,
) -> Result<TypedValue, ParseError> {
    match coerce(session, path, peeled, inner) {
        Ok(typed) => Ok(typed),
        Err(_) => {
            let default_value = crate::value::json_to_value(default_json);
            let mut typed = coerce(session, path, &default_value, inner)
                .unwrap_or(TypedValue::Null(crate::flags::DeserializerConditions::new()));
            typed.flags_mut().add(Flag::DefaultButHadValue { value: original.to_plain() });
            Ok(typed)
        }
    }
}
