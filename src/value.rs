//! Value model & completion algebra (spec.md §3.1, §4.1).
//!
//! `Value` is the intermediate, schema-agnostic tree produced by the
//! extraction layer (markdown/multi-JSON extraction, the fixing state
//! machine, or a plain strict JSON parse). It carries no knowledge of any
//! target schema — that projection happens in `coerce`.

use std::collections::BTreeSet;

use serde_json::Number;

/// Per-node completion state, used to support streaming/partial input
/// (spec.md §3.1 "Completion state").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completion {
    /// Not yet visited while building progressive output.
    Pending,
    /// Parsing ran out of input inside this node; partial content kept.
    Incomplete,
    /// The node's closing delimiter (or terminating quote) was consumed.
    Complete,
}

impl Completion {
    pub fn is_complete(self) -> bool {
        matches!(self, Completion::Complete)
    }
}

/// A structural correction applied by the fixing state machine (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixKind {
    MissingClosingBrace,
    MissingClosingBracket,
    MissingComma,
    TrailingComma,
    MixedQuotes,
    UnquotedKey,
    UnquotedValue,
    NumericKey,
    Dedent,
    LanguageHintStripped,
    CommentStripped,
    UnescapedQuoteInString,
    GarbagePrefix,
}

impl FixKind {
    pub fn description(self) -> &'static str {
        match self {
            FixKind::MissingClosingBrace => "auto-closed missing `}`",
            FixKind::MissingClosingBracket => "auto-closed missing `]`",
            FixKind::MissingComma => "inserted missing `,`",
            FixKind::TrailingComma => "ignored trailing `,`",
            FixKind::MixedQuotes => "normalized non-double quote delimiter",
            FixKind::UnquotedKey => "quoted a bare object key",
            FixKind::UnquotedValue => "quoted a bare string value",
            FixKind::NumericKey => "coerced a numeric object key to a string",
            FixKind::Dedent => "dedented a triple-quoted string",
            FixKind::LanguageHintStripped => "stripped a language hint line",
            FixKind::CommentStripped => "removed a comment",
            FixKind::UnescapedQuoteInString => "treated an embedded quote as literal content",
            FixKind::GarbagePrefix => "treated a leading bareword as a string value",
        }
    }
}

/// The intermediate value tree (spec.md §3.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number, Completion),
    String(String, Completion),
    Array(Vec<Value>, Completion),
    /// Insertion order is significant — used for ambiguity resolution and
    /// diagnostics (spec.md §3.5 invariant 1). Duplicate keys are allowed;
    /// coercion takes the last one but surfaces every entry.
    Object(Vec<(String, Value)>, Completion),
    /// Multiple structurally valid interpretations of the same input.
    /// `variants` is always non-empty (spec.md §3.5 invariant 2).
    AnyOf(Vec<Value>, String),
    /// A value extracted from a fenced markdown code block.
    Markdown(Option<String>, Box<Value>),
    /// A value produced with structural corrections by the fixing state
    /// machine; `fixes` records which corrections were applied.
    Fixed(Box<Value>, BTreeSet<FixKind>),
}

impl Value {
    pub fn string(s: impl Into<String>, completion: Completion) -> Self {
        Value::String(s.into(), completion)
    }

    pub fn fixed(inner: Value, fixes: BTreeSet<FixKind>) -> Self {
        if fixes.is_empty() {
            inner
        } else {
            Value::Fixed(Box::new(inner), fixes)
        }
    }

    pub fn any_of(variants: Vec<Value>, original: impl Into<String>) -> Self {
        debug_assert!(!variants.is_empty(), "AnyOf must carry at least one variant");
        Value::AnyOf(variants, original.into())
    }

    /// The completion state of this node, looking through `Fixed`/`Markdown`
    /// wrappers to the underlying structural node. Scalars not produced by
    /// a streaming-aware path are always `Complete`.
    pub fn completion(&self) -> Completion {
        match self {
            Value::Null | Value::Bool(_) => Completion::Complete,
            Value::Number(_, c) | Value::String(_, c) => *c,
            Value::Array(_, c) | Value::Object(_, c) => *c,
            Value::AnyOf(variants, _) => variants
                .iter()
                .map(Value::completion)
                .max_by_key(|c| matches!(c, Completion::Complete) as u8)
                .unwrap_or(Completion::Complete),
            Value::Markdown(_, inner) | Value::Fixed(inner, _) => inner.completion(),
        }
    }

    /// A short, human-readable name for this value's structural kind, used
    /// in error messages (`UnexpectedType { got, .. }`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_, _) => "number",
            Value::String(_, _) => "string",
            Value::Array(_, _) => "array",
            Value::Object(_, _) => "object",
            Value::AnyOf(_, _) => "any-of",
            Value::Markdown(_, inner) => inner.kind_name(),
            Value::Fixed(inner, _) => inner.kind_name(),
        }
    }

    /// Unwraps `Markdown`/`Fixed` wrappers to reach the underlying
    /// structural node, collecting any fixes encountered along the way.
    pub fn peel<'a>(&'a self, fixes: &mut BTreeSet<FixKind>) -> &'a Value {
        match self {
            Value::Markdown(_, inner) => inner.peel(fixes),
            Value::Fixed(inner, f) => {
                fixes.extend(f.iter().copied());
                inner.peel(fixes)
            }
            other => other,
        }
    }

    /// Promotes `Incomplete` leaves to `Complete` when surrounding context
    /// proves they terminated — used after the fixing parser auto-closes an
    /// outer delimiter but an inner scalar had already been fully read
    /// (spec.md §4.1 `deep_complete`).
    pub fn deep_complete(self) -> Value {
        match self {
            Value::Array(items, _) => {
                let items: Vec<Value> = items.into_iter().map(Value::deep_complete).collect();
                Value::Array(items, Completion::Complete)
            }
            Value::Object(entries, _) => {
                let entries: Vec<(String, Value)> = entries
                    .into_iter()
                    .map(|(k, v)| (k, v.deep_complete()))
                    .collect();
                Value::Object(entries, Completion::Complete)
            }
            Value::Number(n, _) => Value::Number(n, Completion::Complete),
            Value::String(s, _) => Value::String(s, Completion::Complete),
            Value::AnyOf(variants, original) => {
                Value::AnyOf(variants.into_iter().map(Value::deep_complete).collect(), original)
            }
            Value::Markdown(lang, inner) => Value::Markdown(lang, Box::new(inner.deep_complete())),
            Value::Fixed(inner, fixes) => Value::Fixed(Box::new(inner.deep_complete()), fixes),
            other @ (Value::Null | Value::Bool(_)) => other,
        }
    }

    /// Lossy conversion to a plain `serde_json::Value`, for diagnostics and
    /// tests only (spec.md §4.1 `to_plain`): wrappers are dropped and
    /// `AnyOf` collapses to its first variant.
    pub fn to_plain(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n, _) => serde_json::Value::Number(n.clone()),
            Value::String(s, _) => serde_json::Value::String(s.clone()),
            Value::Array(items, _) => {
                serde_json::Value::Array(items.iter().map(Value::to_plain).collect())
            }
            Value::Object(entries, _) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_plain());
                }
                serde_json::Value::Object(map)
            }
            Value::AnyOf(variants, _) => {
                variants.first().map(Value::to_plain).unwrap_or(serde_json::Value::Null)
            }
            Value::Markdown(_, inner) => inner.to_plain(),
            Value::Fixed(inner, _) => inner.to_plain(),
        }
    }
}

/// Converts a plain `serde_json::Value` (e.g. from a strict `serde_json`
/// parse, or a schema's literal/default payload) into our `Value` tree,
/// every node `Complete` since JSON syntax has no notion of truncation.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.clone(), Completion::Complete),
        serde_json::Value::String(s) => Value::String(s.clone(), Completion::Complete),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(json_to_value).collect(), Completion::Complete)
        }
        serde_json::Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect(),
            Completion::Complete,
        ),
    }
}
