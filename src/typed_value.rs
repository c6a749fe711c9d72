//! The schema-projected output (spec.md §3.3).

use crate::flags::DeserializerConditions;

/// A coerced value, paralleling [`crate::value::Value`] but carrying schema
/// identity (enum/class names) and a flag bag on every node.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null(DeserializerConditions),
    Bool(bool, DeserializerConditions),
    Int(i64, DeserializerConditions),
    Float(f64, DeserializerConditions),
    String(String, DeserializerConditions),
    /// `variant` is always rendered in the schema's declared casing
    /// (spec.md §4.7, testable property 4), regardless of how the match
    /// was found.
    Enum {
        name: String,
        variant: String,
        flags: DeserializerConditions,
    },
    Literal(serde_json::Value, DeserializerConditions),
    List {
        items: Vec<TypedValue>,
        flags: DeserializerConditions,
    },
    Map {
        entries: Vec<(String, TypedValue)>,
        flags: DeserializerConditions,
    },
    Class {
        name: String,
        fields: Vec<(String, TypedValue)>,
        flags: DeserializerConditions,
    },
}

impl TypedValue {
    pub fn flags(&self) -> &DeserializerConditions {
        match self {
            TypedValue::Null(f)
            | TypedValue::Bool(_, f)
            | TypedValue::Int(_, f)
            | TypedValue::Float(_, f)
            | TypedValue::String(_, f)
            | TypedValue::Literal(_, f) => f,
            TypedValue::Enum { flags, .. }
            | TypedValue::List { flags, .. }
            | TypedValue::Map { flags, .. }
            | TypedValue::Class { flags, .. } => flags,
        }
    }

    pub fn flags_mut(&mut self) -> &mut DeserializerConditions {
        match self {
            TypedValue::Null(f)
            | TypedValue::Bool(_, f)
            | TypedValue::Int(_, f)
            | TypedValue::Float(_, f)
            | TypedValue::String(_, f)
            | TypedValue::Literal(_, f) => f,
            TypedValue::Enum { flags, .. }
            | TypedValue::List { flags, .. }
            | TypedValue::Map { flags, .. }
            | TypedValue::Class { flags, .. } => flags,
        }
    }

    /// This node's own flag score, ignoring children.
    pub fn own_score(&self) -> u64 {
        self.flags().score()
    }

    /// The full union-scoring penalty for this node (spec.md §4.2
    /// "Composite nodes multiply child-score sums by 10 before
    /// combining"): a composite's own flags plus ten times the total
    /// score of each child, recursively.
    pub fn total_score(&self) -> u64 {
        match self {
            TypedValue::List { items, flags } => {
                flags.score() + 10 * items.iter().map(TypedValue::total_score).sum::<u64>()
            }
            TypedValue::Map { entries, flags } => {
                flags.score()
                    + 10 * entries.iter().map(|(_, v)| v.total_score()).sum::<u64>()
            }
            TypedValue::Class { fields, flags, .. } => {
                flags.score() + 10 * fields.iter().map(|(_, v)| v.total_score()).sum::<u64>()
            }
            _ => self.own_score(),
        }
    }

    /// Lossy conversion to a plain `serde_json::Value`, dropping all flag
    /// and schema-identity information. Used by diagnostics and tests.
    pub fn to_plain(&self) -> serde_json::Value {
        match self {
            TypedValue::Null(_) => serde_json::Value::Null,
            TypedValue::Bool(b, _) => serde_json::Value::Bool(*b),
            TypedValue::Int(i, _) => serde_json::Value::Number((*i).into()),
            TypedValue::Float(f, _) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            TypedValue::String(s, _) => serde_json::Value::String(s.clone()),
            TypedValue::Enum { variant, .. } => serde_json::Value::String(variant.clone()),
            TypedValue::Literal(v, _) => v.clone(),
            TypedValue::List { items, .. } => {
                serde_json::Value::Array(items.iter().map(TypedValue::to_plain).collect())
            }
            TypedValue::Map { entries, .. } => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_plain());
                }
                serde_json::Value::Object(map)
            }
            TypedValue::Class { fields, .. } => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_plain());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}
