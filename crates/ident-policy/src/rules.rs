//! # Rule Sets
//!
//! A [`RuleSet`] is an ordered list of rules plus a fallback target. The
//! resolver walks the rules in order and the first rule that matches
//! decides the target; declaration order is therefore significant.
//!
//! ```text
//! Rule::All { target, requirements }  — every (key, value) must be present exactly
//! Rule::Any { target, keys }          — any one key present, value ignored
//! ```
//!
//! State and level resolution share this shape; only the target type and
//! the way the configuration is projected into rules differ.

use ident_core::LabelKey;
use serde::Serialize;

use crate::config::Requirement;

/// One matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Rule<T> {
    /// Every requirement must hold with its exact value. An empty
    /// requirement list never matches.
    All {
        /// Target produced when the rule matches.
        target: T,
        /// Required key/value pairs.
        requirements: Vec<Requirement>,
    },
    /// Any one key must be present, with any value. An empty key list never
    /// matches.
    Any {
        /// Target produced when the rule matches.
        target: T,
        /// Candidate keys.
        keys: Vec<LabelKey>,
    },
}

impl<T> Rule<T> {
    /// The target this rule resolves to.
    pub fn target(&self) -> &T {
        match self {
            Self::All { target, .. } | Self::Any { target, .. } => target,
        }
    }
}

/// Ordered rules with a fallback target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
    fallback: T,
}

impl<T> RuleSet<T> {
    /// Empty rule set that always resolves to `fallback`.
    pub fn new(fallback: T) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a rule at the lowest priority.
    pub fn push(&mut self, rule: Rule<T>) {
        self.rules.push(rule);
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }

    /// Target when no rule matches.
    pub fn fallback(&self) -> &T {
        &self.fallback
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut set = RuleSet::new("pending".to_string());
        set.push(Rule::Any {
            target: "locked".to_string(),
            keys: vec![LabelKey::new("trade").unwrap()],
        });
        set.push(Rule::Any {
            target: "banned".to_string(),
            keys: vec![LabelKey::new("ban").unwrap()],
        });
        let targets: Vec<_> = set.rules().iter().map(Rule::target).cloned().collect();
        assert_eq!(targets, ["locked", "banned"]);
        assert_eq!(set.fallback(), "pending");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn serializes_with_policy_tag() {
        let rule: Rule<u32> = Rule::Any {
            target: 2,
            keys: vec![LabelKey::new("phone").unwrap()],
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["policy"], "any");
        assert_eq!(json["target"], 2);
        assert_eq!(json["keys"][0], "phone");
    }
}
