//! Recursion, caching & session context (C10, spec.md §3.6, §4.9, §5).
//!
//! A [`Session`] is created once per top-level [`crate::parse`] call and
//! dropped at the end. It owns every cache, the visited set used for
//! cycle detection, and the recursion depth counter. Nothing here is
//! allowed to outlive the call — no `static`, no process-global cache
//! (spec.md §5 "Session-scoped state").

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::ParseOptions;
use crate::error::ParseError;
use crate::schema::{LazyId, Schema};
use crate::typed_value::TypedValue;

/// A location within a `Value`/`TypedValue` tree, rendered in dot/bracket
/// notation for error messages (spec.md §4.12, grounded on the teacher's
/// RFC 6901 pointer helpers but adapted to a human-readable form rather
/// than a JSON Pointer).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopePath(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

impl ScopePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Field(name.into()));
        Self(segments)
    }

    pub fn index(&self, i: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(i));
        Self(segments)
    }

    /// Renders as `$.field[0].other`, always rooted at `$`.
    pub fn render(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.0 {
            match segment {
                Segment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

/// A structural fingerprint of a schema node (spec.md §4.9 "Caching").
/// `Lazy` nodes contribute only their stable id, never their expanded
/// body, so recursive schemas fingerprint without infinite descent.
pub fn schema_fingerprint(schema: &Schema) -> String {
    format!("{schema:?}")
}

/// A structural fingerprint of any value reachable during coercion.
/// Built from `Debug` output, which is sufficient within a single process
/// run; fingerprints are never persisted or compared across sessions.
pub fn value_fingerprint<T: std::fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

/// A schema node's identity for cycle detection: `Lazy` nodes use their
/// stable id, everything else uses its structural fingerprint (non-`Lazy`
/// schemas cannot themselves be recursive, so any consistent identity is
/// sufficient).
pub fn schema_identity(schema: &Schema) -> String {
    match schema {
        Schema::Lazy { id, .. } => id.to_string(),
        other => schema_fingerprint(other),
    }
}

type CacheKey = (String, String);

/// Per-call session state (spec.md §3.6 `ParsingContext`).
pub struct Session {
    pub options: ParseOptions,
    depth: usize,
    visited: HashSet<CacheKey>,
    lazy_cache: HashMap<usize, Rc<Schema>>,
    result_cache: HashMap<CacheKey, Result<TypedValue, ParseError>>,
}

impl Session {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            depth: 0,
            visited: HashSet::new(),
            lazy_cache: HashMap::new(),
            result_cache: HashMap::new(),
        }
    }

    /// Resolves a `Lazy` schema's thunk exactly once per session, keyed by
    /// its stable id (spec.md §4.9 "memoise by thunk identity").
    pub fn resolve_lazy(&mut self, id: LazyId, thunk: &Rc<dyn Fn() -> Schema>) -> Rc<Schema> {
        self.lazy_cache
            .entry(id.0)
            .or_insert_with(|| {
                tracing::debug!(lazy_id = %id, "resolving lazy schema for the first time this session");
                Rc::new(thunk())
            })
            .clone()
    }

    /// Runs `f` under one additional level of recursion, enforcing both
    /// the depth limit and cycle detection (spec.md §4.9, §5). `f` is
    /// given a fresh `&mut Session` borrow once the bookkeeping has been
    /// recorded, so nested recursive calls compose without re-entrancy
    /// issues in the borrow checker.
    pub fn with_recursion<T>(
        &mut self,
        schema_id: String,
        value_fp: String,
        path: &ScopePath,
        f: impl FnOnce(&mut Session) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= self.options.max_depth {
            tracing::warn!(path = %path.render(), max_depth = self.options.max_depth, "recursion limit exceeded");
            return Err(ParseError::RecursionLimit {
                path: path.render(),
                max_depth: self.options.max_depth,
            });
        }
        let key = (schema_id.clone(), value_fp);
        if !self.visited.insert(key.clone()) {
            tracing::warn!(path = %path.render(), schema_id = %schema_id, "circular reference detected");
            return Err(ParseError::CircularReference {
                path: path.render(),
                schema_id,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        self.visited.remove(&key);
        result
    }

    /// Lightweight depth guard used by `coerce::coerce` around every
    /// recursive descent (array elements, object fields, map entries,
    /// union options, wrapper interiors) — independent of
    /// `with_recursion`'s cycle-detecting visited set, which is reserved
    /// for `Lazy` schema re-entry (spec.md §3.5 invariant 5, §5).
    pub fn enter_depth(&mut self, path: &ScopePath) -> Result<(), ParseError> {
        if self.depth >= self.options.max_depth {
            tracing::warn!(path = %path.render(), max_depth = self.options.max_depth, "recursion limit exceeded");
            return Err(ParseError::RecursionLimit {
                path: path.render(),
                max_depth: self.options.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    pub fn cached(&self, schema_fp: &str, value_fp: &str) -> Option<&Result<TypedValue, ParseError>> {
        self.result_cache
            .get(&(schema_fp.to_string(), value_fp.to_string()))
    }

    pub fn cache(&mut self, schema_fp: String, value_fp: String, result: Result<TypedValue, ParseError>) {
        self.result_cache.insert((schema_fp, value_fp), result);
    }

    /// Renders a `TypedValue`'s flag bag (and its children's, recursively)
    /// as a JSON diagnostic view (spec.md §4.11, grounded on
    /// `tryparse::value::FlexValue::explanation_json`).
    pub fn explain(&self, value: &TypedValue) -> serde_json::Value {
        render_explanation(value)
    }
}

fn render_explanation(value: &TypedValue) -> serde_json::Value {
    let flags: Vec<serde_json::Value> = value
        .flags()
        .iter()
        .map(|f| serde_json::json!({ "kind": f.kind_name(), "penalty": f.penalty() }))
        .collect();
    let children = match value {
        TypedValue::List { items, .. } => items.iter().map(render_explanation).collect::<Vec<_>>(),
        TypedValue::Map { entries, .. } => entries
            .iter()
            .map(|(k, v)| serde_json::json!({ "key": k, "value": render_explanation(v) }))
            .collect(),
        TypedValue::Class { fields, .. } => fields
            .iter()
            .map(|(k, v)| serde_json::json!({ "field": k, "value": render_explanation(v) }))
            .collect(),
        _ => Vec::new(),
    };
    serde_json::json!({
        "value": value.to_plain(),
        "flags": flags,
        "own_score": value.own_score(),
        "total_score": value.total_score(),
        "children": children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::DeserializerConditions;

    #[test]
    fn scope_path_renders_dot_bracket_notation() {
        let path = ScopePath::root().field("items").index(2).field("name");
        assert_eq!(path.render(), "$.items[2].name");
    }

    #[test]
    fn with_recursion_detects_cycles() {
        let mut session = Session::new(ParseOptions::default());
        let path = ScopePath::root();
        let outcome = session.with_recursion("s".into(), "v".into(), &path, |session| {
            session.with_recursion("s".into(), "v".into(), &path, |_| Ok(()))
        });
        assert!(matches!(outcome, Err(ParseError::CircularReference { .. })));
    }

    #[test]
    fn with_recursion_allows_sibling_reentry_after_exit() {
        let mut session = Session::new(ParseOptions::default());
        let path = ScopePath::root();
        session
            .with_recursion("s".into(), "v".into(), &path, |_| Ok(()))
            .unwrap();
        let second = session.with_recursion("s".into(), "v".into(), &path, |_| Ok(()));
        assert!(second.is_ok());
    }

    #[test]
    fn with_recursion_enforces_max_depth() {
        let mut options = ParseOptions::default();
        options.max_depth = 1;
        let mut session = Session::new(options);
        let path = ScopePath::root();
        let outcome = session.with_recursion("a".into(), "1".into(), &path, |session| {
            session.with_recursion("b".into(), "2".into(), &path, |_| Ok(()))
        });
        assert!(matches!(outcome, Err(ParseError::RecursionLimit { .. })));
    }

    #[test]
    fn enter_depth_is_independent_of_cycle_detection() {
        let mut options = ParseOptions::default();
        options.max_depth = 2;
        let mut session = Session::new(options);
        let path = ScopePath::root();
        session.enter_depth(&path).unwrap();
        session.enter_depth(&path).unwrap();
        assert!(session.enter_depth(&path).is_err());
        session.exit_depth();
        session.enter_depth(&path).unwrap();
    }

    #[test]
    fn explain_reports_nested_scores() {
        let value = TypedValue::String("x".into(), DeserializerConditions::new());
        let session = Session::new(ParseOptions::default());
        let explanation = session.explain(&value);
        assert_eq!(explanation["value"], serde_json::json!("x"));
    }
}
