//! # Fact Projection
//!
//! The private-scope view of an account's labels: a mapping from key to
//! value. Public labels never appear. The projection is rebuilt from the
//! label set on every call and never memoized across mutations.

use std::collections::BTreeMap;

use ident_core::{Label, LabelKey, LabelValue};
use ident_policy::Requirement;
use serde::Serialize;

/// Private label facts of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FactProjection {
    facts: BTreeMap<LabelKey, LabelValue>,
}

impl FactProjection {
    /// Project the private labels out of `labels`.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        let facts = labels
            .into_iter()
            .filter(|label| label.is_private())
            .map(|label| (label.key.clone(), label.value.clone()))
            .collect();
        Self { facts }
    }

    /// Build directly from key/value pairs, treating every pair as private.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (LabelKey, LabelValue)>) -> Self {
        Self {
            facts: pairs.into_iter().collect(),
        }
    }

    /// Value recorded for `key`, if any.
    pub fn get(&self, key: &LabelKey) -> Option<&LabelValue> {
        self.facts.get(key)
    }

    /// Whether `key` is present with any value.
    pub fn contains_key(&self, key: &LabelKey) -> bool {
        self.facts.contains_key(key)
    }

    /// Whether any of `keys` is present, value ignored.
    pub fn contains_any(&self, keys: &[LabelKey]) -> bool {
        keys.iter().any(|key| self.contains_key(key))
    }

    /// Whether every requirement is present with exactly its value.
    ///
    /// Vacuously true for an empty candidate; callers that treat an empty
    /// requirement list as "never satisfied" must check that themselves.
    pub fn labels_include(&self, candidate: &[Requirement]) -> bool {
        candidate
            .iter()
            .all(|req| self.facts.get(&req.key) == Some(&req.value))
    }

    /// Number of private facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether there are no private facts.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterate facts in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&LabelKey, &LabelValue)> {
        self.facts.iter()
    }
}
