use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

#[derive(Clone, Debug, Eq, Default)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

pub type Expressions = Vec<Expression>;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Expression {
    key: String,
    operator: Operator,
    #[serde(default)]
    values: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// Selects a set of pods by label.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_labels: Option<Map>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_expressions: Option<Expressions>,
}

// === Selector ===

impl Selector {
    pub fn from_expressions(exprs: Expressions) -> Self {
        Self {
            match_labels: None,
            match_expressions: Some(exprs),
        }
    }

    pub fn from_map(map: Map) -> Self {
        Self {
            match_labels: Some(map),
            match_expressions: None,
        }
    }

    /// The equality constraints of this selector. Empty when none are set.
    pub fn match_labels(&self) -> &Map {
        static EMPTY: Map = Map::new();
        self.match_labels.as_ref().unwrap_or(&EMPTY)
    }

    /// The `matchLabels` map, only if the resource declared one.
    pub fn declared_match_labels(&self) -> Option<&Map> {
        self.match_labels.as_ref()
    }

    /// Returns the value this selector requires for `key`, if any.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.match_labels().get(key).map(String::as_str)
    }

    /// True when the selector has no constraints and so selects every pod.
    pub fn is_empty(&self) -> bool {
        self.match_labels().is_empty() && self.match_expressions.iter().flatten().next().is_none()
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        for expr in self.match_expressions.iter().flatten() {
            if !expr.matches(labels.as_ref()) {
                return false;
            }
        }

        for (k, v) in self.match_labels().iter() {
            if labels.0.get(k) != Some(v) {
                return false;
            }
        }

        true
    }

    /// Conservatively decides whether two selectors could select a common pod.
    ///
    /// Only `matchLabels` are considered: selectors overlap when either one has
    /// no labels, or when both require an identical key/value pair. Selectors
    /// that only disagree on values are disjoint; selectors with disjoint keys
    /// are not flagged.
    ///
    /// A selector constrained only by `matchExpressions` has no labels, so it
    /// overlaps every selector even though it is not [`Selector::is_empty`].
    pub fn may_overlap(&self, other: &Self) -> bool {
        let (a, b) = (self.match_labels(), other.match_labels());
        if a.is_empty() || b.is_empty() {
            return true;
        }

        a.iter().any(|(k, v)| b.get(k) == Some(v))
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl std::iter::FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self::from_expressions(iter.into_iter().collect())
    }
}

// === Labels ===

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl From<Option<Map>> for Labels {
    #[inline]
    fn from(labels: Option<Map>) -> Self {
        labels.unwrap_or_default().into()
    }
}

impl AsRef<Map> for Labels {
    #[inline]
    fn as_ref(&self) -> &Map {
        self.0.as_ref()
    }
}

impl<T: AsRef<Map>> std::cmp::PartialEq<T> for Labels {
    #[inline]
    fn eq(&self, t: &T) -> bool {
        self.0.as_ref().eq(t.as_ref())
    }
}

impl std::iter::FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// === Expression ===

impl Expression {
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, labels: &Map) -> bool {
        match self.operator {
            Operator::In => labels
                .get(&self.key)
                .map(|v| self.values.contains(v))
                .unwrap_or(false),
            Operator::NotIn => labels
                .get(&self.key)
                .map(|v| !self.values.contains(v))
                .unwrap_or(true),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::FromIterator;

    #[test]
    fn test_matches() {
        for (selector, labels, matches, msg) in &[
            (Selector::default(), Labels::default(), true, "empty match"),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(Some(("foo", "bar"))),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(Some(("foo", "baz"))),
                false,
                "value mismatch",
            ),
            (
                Selector::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                Labels::from_iter(Some(("foo", "bar"))),
                false,
                "missing label",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::In, ["bar"]))),
                Labels::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                true,
                "expression match",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::NotIn, ["bar"]))),
                Labels::from_iter(Some(("foo", "bar"))),
                false,
                "excluded by expression",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::NotIn, ["bar"]))),
                Labels::default(),
                true,
                "absent key is not excluded",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "foo",
                    Operator::Exists,
                    Vec::<String>::new(),
                ))),
                Labels::from_iter(Some(("foo", "anything"))),
                true,
                "key exists",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "foo",
                    Operator::DoesNotExist,
                    Vec::<String>::new(),
                ))),
                Labels::from_iter(Some(("foo", "anything"))),
                false,
                "key must not exist",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }

    #[test]
    fn test_may_overlap() {
        for (a, b, overlaps, msg) in &[
            (
                Selector::default(),
                Selector::from_iter(Some(("app", "web"))),
                true,
                "empty selector overlaps everything",
            ),
            (
                Selector::from_iter(Some(("app", "web"))),
                Selector::from_iter(vec![("app", "web"), ("tier", "front")]),
                true,
                "shared pair",
            ),
            (
                Selector::from_iter(Some(("app", "web"))),
                Selector::from_iter(Some(("app", "api"))),
                false,
                "conflicting values",
            ),
            (
                Selector::from_iter(Some(("app", "web"))),
                Selector::from_iter(Some(("tier", "front"))),
                false,
                "disjoint keys",
            ),
            (
                Selector::from_iter(Some(Expression::new("app", Operator::In, ["web"]))),
                Selector::from_iter(Some(("app", "api"))),
                true,
                "expressions are not compared",
            ),
        ] {
            assert_eq!(a.may_overlap(b), *overlaps, "{}", msg);
            assert_eq!(b.may_overlap(a), *overlaps, "{} (reversed)", msg);
        }
    }

    #[test]
    fn empty_selector() {
        assert!(Selector::default().is_empty());
        assert!(Selector::from_map(Map::new()).is_empty());
        assert!(!Selector::from_iter(Some(("app", "web"))).is_empty());
        assert!(!Selector::from_iter(Some(Expression::new(
            "app",
            Operator::Exists,
            Vec::<String>::new()
        )))
        .is_empty());
    }

    #[test]
    fn deserializes_match_labels() {
        let selector: Selector = serde_json::from_value(serde_json::json!({
            "matchLabels": { "app": "backend" },
        }))
        .expect("selector must parse");
        assert_eq!(selector.label("app"), Some("backend"));
    }
}
