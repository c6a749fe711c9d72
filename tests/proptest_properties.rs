//! Property-based tests for the testable properties spec.md §8 lists as
//! part of the parser's contract: strict-JSON values round-trip flag-free,
//! scalar-to-array wrapping is idempotent, and union resolution is
//! deterministic across repeated runs on identical input.

use proptest::prelude::*;
use schema_salvage::{parse, DeserializerConditions, ParseOptions, Schema, TypedValue};

/// A JSON scalar plus the `Schema` that exactly matches its kind, so a
/// strict parse of its rendered form should need no coercion at all.
#[derive(Debug, Clone)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<bool>().prop_map(Scalar::Bool),
        any::<i32>().prop_map(|i| Scalar::Int(i as i64)),
        "[a-zA-Z0-9 _-]{1,24}".prop_map(Scalar::Text),
    ]
}

fn arb_non_string_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<bool>().prop_map(Scalar::Bool),
        any::<i32>().prop_map(|i| Scalar::Int(i as i64)),
    ]
}

impl Scalar {
    /// The text form `parse` is fed. For `Text`, this is the raw string
    /// itself, unquoted: a `String` schema takes the input verbatim via
    /// `parse`'s short-circuit rule (spec.md §4.5), so there is no JSON
    /// encoding step to mirror here.
    fn render(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn schema(&self) -> Schema {
        match self {
            Scalar::Bool(_) => Schema::Bool,
            Scalar::Int(_) => Schema::Number { integer: true },
            Scalar::Text(_) => Schema::String,
        }
    }

    fn expect_typed(&self) -> TypedValue {
        match self {
            Scalar::Bool(b) => TypedValue::Bool(*b, DeserializerConditions::new()),
            Scalar::Int(i) => TypedValue::Int(*i, DeserializerConditions::new()),
            Scalar::Text(s) => TypedValue::String(s.clone(), DeserializerConditions::new()),
        }
    }
}

proptest! {
    /// spec.md §8 testable property 1 ("strict-JSON identity"), narrowed
    /// to our closed schema set: a scalar whose rendered JSON form is
    /// parsed against the schema matching its own kind needs zero flags.
    #[test]
    fn strict_json_scalar_round_trips_without_flags(scalar in arb_scalar()) {
        let rendered = scalar.render();
        let schema = scalar.schema();
        let result = parse(&rendered, &schema, ParseOptions::default()).unwrap();
        prop_assert_eq!(result, scalar.expect_typed());
    }

    /// spec.md §8 testable property 3 ("single-to-array idempotence"): a
    /// scalar parsed against `Array<T>` is exactly `[parse(v, T)]`,
    /// flagged `SingleToArray`.
    ///
    /// Restricted to `Bool`/`Int`: a bare `String` schema at the top of
    /// `parse` takes the raw input verbatim (spec.md §4.5 short-circuit),
    /// while the same schema reached by unwrapping an `Array` goes
    /// through ordinary structural extraction — text that happens to
    /// look like a JSON number or bool would legitimately pick up a
    /// `JsonToString` flag in the wrapped path but not the standalone
    /// one, which isn't the property under test here.
    #[test]
    fn single_scalar_wraps_into_one_element_array(scalar in arb_non_string_scalar()) {
        let rendered = scalar.render();
        let inner_schema = scalar.schema();
        let array_schema = Schema::Array(Box::new(inner_schema.clone()));

        let wrapped = parse(&rendered, &array_schema, ParseOptions::default()).unwrap();
        let alone = parse(&rendered, &inner_schema, ParseOptions::default()).unwrap();

        match wrapped {
            TypedValue::List { items, flags } => {
                prop_assert_eq!(items, vec![alone]);
                prop_assert!(flags.has("single_to_array"));
            }
            other => prop_assert!(false, "expected a list, got {other:?}"),
        }
    }

    /// spec.md §8 testable property 6 ("union determinism"): parsing the
    /// same input against the same union schema twice, in fresh sessions,
    /// yields identical `TypedValue`s.
    #[test]
    fn union_resolution_is_deterministic(scalar in arb_scalar()) {
        let rendered = scalar.render();
        let schema = Schema::Union(vec![Schema::Bool, Schema::Number { integer: true }, Schema::String]);

        let first = parse(&rendered, &schema, ParseOptions::default());
        let second = parse(&rendered, &schema, ParseOptions::default());

        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "determinism requires both runs to agree on success or failure"),
        }
    }
}
