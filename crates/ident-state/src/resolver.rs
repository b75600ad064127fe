//! # Rule Resolution
//!
//! One algorithm serves both the state and the level resolver:
//!
//! 1. Walk the rule set in order.
//! 2. An ALL rule matches when its requirement list is non-empty and every
//!    `(key, value)` is present exactly in the facts.
//! 3. An ANY rule matches when any one of its keys is present, with any
//!    value.
//! 4. The first matching rule's target wins; otherwise the fallback.
//!
//! Nothing about the account's previous state is consulted. Removing the last
//! fact that satisfied a rule therefore drops the account to the next
//! matching rule, or to the fallback.

use ident_policy::{PolicyConfig, Rule, RuleSet};

use crate::facts::FactProjection;

/// Resolve a target from `facts` using first-match-wins over `rules`.
pub fn resolve<T: Clone>(facts: &FactProjection, rules: &RuleSet<T>) -> T {
    rules
        .rules()
        .iter()
        .find(|rule| rule_matches(facts, rule))
        .map(|rule| rule.target().clone())
        .unwrap_or_else(|| rules.fallback().clone())
}

fn rule_matches<T>(facts: &FactProjection, rule: &Rule<T>) -> bool {
    match rule {
        Rule::All { requirements, .. } => {
            !requirements.is_empty() && facts.labels_include(requirements)
        }
        Rule::Any { keys, .. } => facts.contains_any(keys),
    }
}

/// Lifecycle state for `facts` under `policy`.
pub fn resolve_state(facts: &FactProjection, policy: &PolicyConfig) -> String {
    resolve(facts, &policy.state_rule_set())
}

/// Trust level for `facts` under `policy`.
pub fn resolve_level(facts: &FactProjection, policy: &PolicyConfig) -> u32 {
    resolve(facts, &policy.level_rule_set())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ident_core::{LabelKey, LabelValue};
    use ident_policy::Requirement;
    use proptest::prelude::*;

    const POLICY: &str = r#"
activation_requirements:
  phone: verified
  documents: verified
state_triggers:
  locked: [trade, withdraw]
  banned: [ban]
level_rules:
  1: { email: verified }
  2: { phone: verified }
  3: { documents: verified }
"#;

    fn policy() -> PolicyConfig {
        PolicyConfig::from_yaml_str(POLICY).unwrap()
    }

    fn facts(pairs: &[(&str, &str)]) -> FactProjection {
        FactProjection::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (LabelKey::new(k).unwrap(), LabelValue::new(v).unwrap())),
        )
    }

    #[test]
    fn no_facts_is_pending() {
        assert_eq!(resolve_state(&facts(&[]), &policy()), "pending");
    }

    #[test]
    fn all_policy_needs_every_requirement() {
        let p = policy();
        assert_eq!(resolve_state(&facts(&[("phone", "verified")]), &p), "pending");
        assert_eq!(
            resolve_state(&facts(&[("phone", "verified"), ("documents", "verified")]), &p),
            "active"
        );
        assert_eq!(
            resolve_state(&facts(&[("phone", "verified"), ("documents", "rejected")]), &p),
            "pending"
        );
    }

    #[test]
    fn activation_wins_over_triggers() {
        let state = resolve_state(
            &facts(&[("phone", "verified"), ("documents", "verified"), ("trade", "off")]),
            &policy(),
        );
        assert_eq!(state, "active");
    }

    #[test]
    fn any_policy_ignores_value() {
        assert_eq!(resolve_state(&facts(&[("withdraw", "whatever")]), &policy()), "locked");
    }

    #[test]
    fn first_declared_trigger_wins() {
        assert_eq!(
            resolve_state(&facts(&[("ban", "yes"), ("trade", "off")]), &policy()),
            "locked"
        );
        assert_eq!(resolve_state(&facts(&[("ban", "yes")]), &policy()), "banned");
    }

    #[test]
    fn failing_activation_falls_through_to_trigger() {
        assert_eq!(
            resolve_state(&facts(&[("phone", "verified"), ("trade", "off")]), &policy()),
            "locked"
        );
    }

    #[test]
    fn empty_activation_requirements_never_yield_active() {
        let p = PolicyConfig::from_yaml_str("state_triggers:\n  locked: [trade]\n").unwrap();
        assert_eq!(resolve_state(&facts(&[]), &p), "pending");
        assert_eq!(resolve_state(&facts(&[("phone", "verified")]), &p), "pending");
    }

    #[test]
    fn empty_all_rule_never_matches() {
        let mut set = RuleSet::new("fallback");
        set.push(Rule::All {
            target: "vacuous",
            requirements: Vec::<Requirement>::new(),
        });
        assert_eq!(resolve(&facts(&[("phone", "verified")]), &set), "fallback");
    }

    #[test]
    fn level_climbs_the_ladder() {
        let p = policy();
        assert_eq!(resolve_level(&facts(&[]), &p), 0);
        assert_eq!(resolve_level(&facts(&[("email", "verified")]), &p), 1);
        assert_eq!(
            resolve_level(&facts(&[("email", "verified"), ("phone", "verified")]), &p),
            2
        );
        assert_eq!(
            resolve_level(
                &facts(&[
                    ("email", "verified"),
                    ("phone", "verified"),
                    ("documents", "verified")
                ]),
                &p
            ),
            3
        );
    }

    #[test]
    fn level_stops_at_first_missing_rung() {
        let p = policy();
        assert_eq!(resolve_level(&facts(&[("phone", "verified")]), &p), 0);
        assert_eq!(
            resolve_level(&facts(&[("email", "verified"), ("documents", "verified")]), &p),
            1
        );
    }

    #[test]
    fn level_without_rules_is_zero() {
        assert_eq!(
            resolve_level(&facts(&[("email", "verified")]), &PolicyConfig::default()),
            0
        );
    }

    fn arb_facts() -> impl Strategy<Value = Vec<(String, String)>> {
        let keys = prop::sample::select(vec![
            "phone", "documents", "email", "trade", "withdraw", "ban", "otp",
        ]);
        let values = prop::sample::select(vec!["verified", "rejected", "pending", "yes"]);
        prop::collection::vec((keys, values), 0..7).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn resolution_is_idempotent(pairs in arb_facts()) {
            let borrowed: Vec<(&str, &str)> =
                pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let f = facts(&borrowed);
            let p = policy();
            prop_assert_eq!(resolve_state(&f, &p), resolve_state(&f, &p));
            prop_assert_eq!(resolve_level(&f, &p), resolve_level(&f, &p));
        }

        #[test]
        fn resolved_state_is_a_declared_target(pairs in arb_facts()) {
            let borrowed: Vec<(&str, &str)> =
                pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let state = resolve_state(&facts(&borrowed), &policy());
            prop_assert!(["active", "locked", "banned", "pending"].contains(&state.as_str()));
        }
    }
}
