//! Flag system (spec.md §3.2, §4.2).
//!
//! Every coerced value carries a [`DeserializerConditions`] bag recording
//! each non-trivial decision the coercer made. The bag is both the
//! human-facing explanation of a result and the raw material for union
//! scoring (`coerce::union`).

use serde::{Deserialize, Serialize};

/// A single coercion decision, with payload where the decision needs one
/// to be useful in diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Flag {
    /// The value (or a node within it) was truncated by the input ending
    /// mid-structure.
    Incomplete,
    /// A scalar was wrapped in a one-element array to satisfy an `Array`
    /// schema.
    SingleToArray,
    /// A non-string value was serialized to text to satisfy a `String`
    /// schema.
    JsonToString,
    /// A string was interpreted as a boolean (`"true"`, `"yes"`, a bare
    /// word match, ...).
    StringToBool,
    /// A string was parsed as a floating-point number.
    StringToFloat,
    /// A float value was rounded to satisfy an `Int` schema.
    FloatToInt,
    /// An enum/literal match was found as a substring of the query text.
    SubstringMatch { matched: String },
    /// The substring matcher found a non-exact match among several
    /// candidates before settling on one; payload is every candidate that
    /// was in contention, with its match length.
    StrMatchOneFromMany { candidates: Vec<(String, u32)> },
    /// A field/entry was absent and its schema default was used.
    DefaultFromNoValue,
    /// A field had a non-null value where a `Nullable`/`Optional` schema
    /// defaulted it to null anyway.
    DefaultButHadValue { value: serde_json::Value },
    /// An object key not declared by the schema was present in the input.
    ExtraKey { key: String, value: serde_json::Value },
    /// An array element failed to coerce; the element was dropped rather
    /// than failing the whole array.
    ArrayItemParseError { index: usize, error: String },
    /// A map/record value failed to coerce; the entry was dropped rather
    /// than failing the whole map.
    MapValueParseError { key: String, error: String },
    /// An array of `{"key":..,"value":..}` pairs was reinterpreted as a
    /// map/record.
    ObjectToMap,
    /// An object was serialized to text to satisfy a `String` schema.
    ObjectToString,
    /// More than one array element was available where a scalar was
    /// wanted; the first was used.
    FirstOfMultiple,
    /// A soft (`check`) constraint failed; coercion continued.
    ConstraintWarning { message: String },
}

impl Flag {
    /// The non-negative penalty this flag contributes to union scoring
    /// (spec.md §4.2). Composite compounding (×10 per nesting level) is
    /// applied by the caller (`TypedValue::total_score`), not here.
    pub fn penalty(&self) -> u64 {
        match self {
            Flag::StringToBool
            | Flag::StringToFloat
            | Flag::FloatToInt
            | Flag::JsonToString
            | Flag::ObjectToString
            | Flag::SingleToArray
            | Flag::ObjectToMap
            | Flag::DefaultFromNoValue
            | Flag::Incomplete
            | Flag::FirstOfMultiple => 1,
            Flag::SubstringMatch { .. } => 2,
            Flag::StrMatchOneFromMany { candidates } => {
                1 + candidates.len().saturating_sub(1) as u64
            }
            Flag::DefaultButHadValue { .. } => 100,
            Flag::ExtraKey { .. } => 1,
            Flag::ArrayItemParseError { .. } | Flag::MapValueParseError { .. } => 110,
            Flag::ConstraintWarning { .. } => 5,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Flag::Incomplete => "incomplete",
            Flag::SingleToArray => "single_to_array",
            Flag::JsonToString => "json_to_string",
            Flag::StringToBool => "string_to_bool",
            Flag::StringToFloat => "string_to_float",
            Flag::FloatToInt => "float_to_int",
            Flag::SubstringMatch { .. } => "substring_match",
            Flag::StrMatchOneFromMany { .. } => "str_match_one_from_many",
            Flag::DefaultFromNoValue => "default_from_no_value",
            Flag::DefaultButHadValue { .. } => "default_but_had_value",
            Flag::ExtraKey { .. } => "extra_key",
            Flag::ArrayItemParseError { .. } => "array_item_parse_error",
            Flag::MapValueParseError { .. } => "map_value_parse_error",
            Flag::ObjectToMap => "object_to_map",
            Flag::ObjectToString => "object_to_string",
            Flag::FirstOfMultiple => "first_of_multiple",
            Flag::ConstraintWarning { .. } => "constraint_warning",
        }
    }
}

/// An ordered multiset of [`Flag`]s attached to a coerced value. Insertion
/// order is preserved for diagnostics; scoring is order-independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeserializerConditions(Vec<Flag>);

impl DeserializerConditions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, flag: Flag) {
        self.0.push(flag);
    }

    /// Returns `true` if any flag in the bag has the given kind name
    /// (see [`Flag::kind_name`]).
    pub fn has(&self, kind: &str) -> bool {
        self.0.iter().any(|f| f.kind_name() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }

    /// Appends every flag from `other`, preserving `self`'s flags first.
    pub fn merge(&mut self, other: DeserializerConditions) {
        self.0.extend(other.0);
    }

    /// The sum of every flag's penalty (spec.md §4.2 table). Does not
    /// apply composite ×10 compounding — see `TypedValue::total_score`.
    pub fn score(&self) -> u64 {
        self.0.iter().map(Flag::penalty).sum()
    }
}

impl FromIterator<Flag> for DeserializerConditions {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for DeserializerConditions {
    type Item = Flag;
    type IntoIter = std::vec::IntoIter<Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bag_scores_zero() {
        assert_eq!(DeserializerConditions::new().score(), 0);
    }

    #[test]
    fn merge_preserves_order() {
        let mut a = DeserializerConditions::new();
        a.add(Flag::SingleToArray);
        let mut b = DeserializerConditions::new();
        b.add(Flag::Incomplete);
        a.merge(b);
        let kinds: Vec<_> = a.iter().map(Flag::kind_name).collect();
        assert_eq!(kinds, vec!["single_to_array", "incomplete"]);
    }

    #[test]
    fn default_but_had_value_dominates_scoring() {
        let mut bag = DeserializerConditions::new();
        bag.add(Flag::DefaultButHadValue {
            value: serde_json::json!(1),
        });
        assert!(bag.score() >= 100);
    }

    #[test]
    fn str_match_one_from_many_penalizes_ambiguity_width() {
        let few = Flag::StrMatchOneFromMany {
            candidates: vec![("A".into(), 3)],
        };
        let many = Flag::StrMatchOneFromMany {
            candidates: vec![("A".into(), 3), ("B".into(), 3), ("C".into(), 2)],
        };
        assert!(many.penalty() > few.penalty());
    }

    #[test]
    fn has_looks_up_by_kind_name() {
        let mut bag = DeserializerConditions::new();
        bag.add(Flag::ExtraKey {
            key: "x".into(),
            value: serde_json::json!(null),
        });
        assert!(bag.has("extra_key"));
        assert!(!bag.has("incomplete"));
    }
}
