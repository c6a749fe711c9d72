//! The abstract schema-node view the coercer consumes (spec.md §3.4).
//!
//! The core never sees the schema-description library itself (that is an
//! external collaborator, spec.md §1) — only this enumerated view. Callers
//! build a `Schema` tree describing the shape they want `parse` to produce.

use std::fmt;
use std::rc::Rc;

use crate::typed_value::TypedValue;

/// Stable identity for a [`Schema::Lazy`] node, used for cycle detection
/// and cache fingerprinting (spec.md §4.9 "Recursion/lazy handling").
/// Two `Lazy` nodes built from the same `Rc` share an id; unrelated `Lazy`
/// nodes never collide because the id is derived from the thunk's
/// allocation address, not from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LazyId(pub usize);

impl fmt::Display for LazyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lazy#{:x}", self.0)
    }
}

/// How a [`Schema::Refined`] predicate failure is handled (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Hard failure: aborts the whole coercion with `ConstraintFailed`.
    Assert,
    /// Soft failure: coercion continues; a `ConstraintWarning` flag is
    /// recorded and contributes a small penalty to union scoring.
    Check,
}

/// A post-coercion predicate over a produced [`TypedValue`].
pub type Predicate = Rc<dyn Fn(&TypedValue) -> bool>;

/// The abstract schema tree (spec.md §3.4).
#[derive(Clone)]
pub enum Schema {
    String,
    Number { integer: bool },
    Bool,
    Null,
    Literal(serde_json::Value),
    Enum { name: String, variants: Vec<String> },
    Array(Box<Schema>),
    Map { key: Box<Schema>, value: Box<Schema> },
    Object {
        name: String,
        /// Declaration order matters (spec.md §5 "Ordering guarantees").
        fields: Vec<Field>,
    },
    Union(Vec<Schema>),
    Optional(Box<Schema>),
    Nullable(Box<Schema>),
    Default(Box<Schema>, serde_json::Value),
    /// A thunk resolved once per session and memoised by `id` (see
    /// `context::Session::resolve_lazy`), giving recursive schemas a
    /// stable identity without eagerly expanding the cycle.
    Lazy {
        id: LazyId,
        thunk: Rc<dyn Fn() -> Schema>,
    },
    Refined {
        inner: Box<Schema>,
        predicate: Predicate,
        message: String,
        severity: Severity,
    },
}

#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: false,
        }
    }
}

impl Schema {
    /// A short, stable name for this schema's kind, used in error messages
    /// and fingerprints.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::String => "string",
            Schema::Number { .. } => "number",
            Schema::Bool => "bool",
            Schema::Null => "null",
            Schema::Literal(_) => "literal",
            Schema::Enum { .. } => "enum",
            Schema::Array(_) => "array",
            Schema::Map { .. } => "map",
            Schema::Object { .. } => "object",
            Schema::Union(_) => "union",
            Schema::Optional(_) => "optional",
            Schema::Nullable(_) => "nullable",
            Schema::Default(_, _) => "default",
            Schema::Lazy { .. } => "lazy",
            Schema::Refined { .. } => "refined",
        }
    }

    /// Strips `Optional`/`Nullable`/`Default` wrappers to reach the
    /// underlying structural schema, without resolving `Lazy` (that
    /// requires a session to memoise against).
    pub fn innermost(&self) -> &Schema {
        match self {
            Schema::Optional(inner) | Schema::Nullable(inner) | Schema::Default(inner, _) => {
                inner.innermost()
            }
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Schema::Optional(_) | Schema::Nullable(_) | Schema::Default(_, _))
    }

    pub fn default_value(&self) -> Option<&serde_json::Value> {
        match self {
            Schema::Default(_, v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::String => write!(f, "String"),
            Schema::Number { integer } => write!(f, "Number {{ integer: {integer} }}"),
            Schema::Bool => write!(f, "Bool"),
            Schema::Null => write!(f, "Null"),
            Schema::Literal(v) => write!(f, "Literal({v})"),
            Schema::Enum { name, variants } => write!(f, "Enum {{ name: {name}, variants: {variants:?} }}"),
            Schema::Array(inner) => write!(f, "Array({inner:?})"),
            Schema::Map { key, value } => write!(f, "Map {{ key: {key:?}, value: {value:?} }}"),
            Schema::Object { name, fields } => {
                write!(f, "Object {{ name: {name}, fields: [")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}{}: {:?}", field.name, if field.required { "" } else { "?" }, field.schema)?;
                }
                write!(f, "] }}")
            }
            Schema::Union(options) => write!(f, "Union({options:?})"),
            Schema::Optional(inner) => write!(f, "Optional({inner:?})"),
            Schema::Nullable(inner) => write!(f, "Nullable({inner:?})"),
            Schema::Default(inner, v) => write!(f, "Default({inner:?}, {v})"),
            Schema::Lazy { id, .. } => write!(f, "Lazy({id})"),
            Schema::Refined { inner, message, severity, .. } => {
                write!(f, "Refined({inner:?}, {message:?}, {severity:?})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_strips_wrappers_but_not_lazy() {
        let s = Schema::Optional(Box::new(Schema::Default(Box::new(Schema::String), serde_json::json!("x"))));
        assert_eq!(s.innermost().kind_name(), "string");
    }

    #[test]
    fn lazy_ids_from_same_rc_are_equal_by_construction() {
        let id = LazyId(42);
        let thunk: Rc<dyn Fn() -> Schema> = Rc::new(|| Schema::Null);
        let a = Schema::Lazy { id, thunk: thunk.clone() };
        let b = Schema::Lazy { id, thunk };
        match (a, b) {
            (Schema::Lazy { id: a, .. }, Schema::Lazy { id: b, .. }) => assert_eq!(a, b),
            _ => unreachable!(),
        }
    }
}
