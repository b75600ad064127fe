//! # Policy Configuration
//!
//! Typed form of the rule configuration. Three optional sections, each an
//! ordered YAML mapping:
//!
//! ```yaml
//! activation_requirements:   # ALL policy: key -> required value
//!   phone: verified
//!   documents: verified
//! state_triggers:            # ANY policy: state -> keys
//!   locked: [trade, withdraw]
//! level_rules:               # ladder: level -> key -> value
//!   1: { email: verified }
//!   2: { phone: verified }
//! ```
//!
//! Parsing validates every key and value with the label rules from
//! `ident-core`, so a configured requirement can always be compared with a
//! stored label verbatim.
//!
//! ## Level Ladder
//!
//! Level `n` is reached only when its own requirements and the requirements
//! of every lower declared level hold. [`PolicyConfig::level_rule_set`]
//! expresses this as cumulative ALL rules ordered highest level first, so the
//! shared first-match resolver yields the highest satisfied rung.

use std::collections::HashSet;

use ident_core::{LabelKey, LabelValue, DEFAULT_LEVEL, DEFAULT_STATE};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::PolicyError;
use crate::rules::{Rule, RuleSet};

/// State produced when every activation requirement holds.
pub const ACTIVE_STATE: &str = "active";

const ACTIVATION_REQUIREMENTS: &str = "activation_requirements";
const STATE_TRIGGERS: &str = "state_triggers";
const LEVEL_RULES: &str = "level_rules";

/// A single `key = value` requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Requirement {
    /// Required label key.
    pub key: LabelKey,
    /// Required label value.
    pub value: LabelValue,
}

impl Requirement {
    /// Build a requirement from raw strings, normalizing both.
    pub fn new(key: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self, ident_core::ValidationError> {
        Ok(Self {
            key: LabelKey::new(key)?,
            value: LabelValue::new(value)?,
        })
    }
}

/// ANY-policy trigger: `state` is reachable when any of `keys` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTrigger {
    /// Target state name.
    pub state: String,
    /// Keys whose presence triggers the state.
    pub keys: Vec<LabelKey>,
}

/// One rung of the level ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelRule {
    /// Level number, strictly positive.
    pub level: u32,
    /// Requirements introduced at this rung.
    pub requirements: Vec<Requirement>,
}

/// Validated rule configuration.
///
/// `level_rules` is kept sorted by ascending level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyConfig {
    /// ALL-policy requirements for the `active` state.
    pub activation_requirements: Vec<Requirement>,
    /// ANY-policy triggers in declaration order.
    pub state_triggers: Vec<StateTrigger>,
    /// Level ladder, ascending.
    pub level_rules: Vec<LevelRule>,
}

impl PolicyConfig {
    /// Parse and validate a YAML policy document.
    ///
    /// An empty document yields an empty configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let value: Value =
            serde_yaml::from_str(yaml).map_err(|e| PolicyError::Parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Build from an already-parsed YAML value.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let root = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(m) => m,
            _ => return Err(PolicyError::Parse("policy must be a YAML mapping".to_string())),
        };

        for key in root.keys() {
            let known = matches!(
                key.as_str(),
                Some(ACTIVATION_REQUIREMENTS | STATE_TRIGGERS | LEVEL_RULES)
            );
            if !known {
                tracing::debug!(section = ?key, "ignoring unrecognized policy section");
            }
        }

        let config = Self {
            activation_requirements: match section(root, ACTIVATION_REQUIREMENTS)? {
                Some(m) => parse_requirements(ACTIVATION_REQUIREMENTS, m)?,
                None => Vec::new(),
            },
            state_triggers: match section(root, STATE_TRIGGERS)? {
                Some(m) => parse_triggers(m)?,
                None => Vec::new(),
            },
            level_rules: match section(root, LEVEL_RULES)? {
                Some(m) => parse_levels(m)?,
                None => Vec::new(),
            },
        };

        tracing::debug!(
            requirements = config.activation_requirements.len(),
            triggers = config.state_triggers.len(),
            levels = config.level_rules.len(),
            "policy configuration loaded"
        );
        Ok(config)
    }

    /// Whether all three sections are empty.
    pub fn is_empty(&self) -> bool {
        self.activation_requirements.is_empty()
            && self.state_triggers.is_empty()
            && self.level_rules.is_empty()
    }

    /// Rules for state resolution.
    ///
    /// The activation rule comes first and is omitted entirely when there are
    /// no activation requirements. Triggers follow in declaration order.
    pub fn state_rule_set(&self) -> RuleSet<String> {
        let mut set = RuleSet::new(DEFAULT_STATE.to_string());
        if !self.activation_requirements.is_empty() {
            set.push(Rule::All {
                target: ACTIVE_STATE.to_string(),
                requirements: self.activation_requirements.clone(),
            });
        }
        for trigger in &self.state_triggers {
            set.push(Rule::Any {
                target: trigger.state.clone(),
                keys: trigger.keys.clone(),
            });
        }
        set
    }

    /// Rules for level resolution: cumulative ALL rules, highest level first.
    pub fn level_rule_set(&self) -> RuleSet<u32> {
        let mut cumulative: Vec<Requirement> = Vec::new();
        let mut ladder = Vec::with_capacity(self.level_rules.len());
        for rung in &self.level_rules {
            cumulative.extend(rung.requirements.iter().cloned());
            ladder.push(Rule::All {
                target: rung.level,
                requirements: cumulative.clone(),
            });
        }

        let mut set = RuleSet::new(DEFAULT_LEVEL);
        for rule in ladder.into_iter().rev() {
            set.push(rule);
        }
        set
    }
}

/// Fetch a top-level section as a mapping. `null` counts as absent.
fn section<'a>(root: &'a Mapping, name: &'static str) -> Result<Option<&'a Mapping>, PolicyError> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(m)) => Ok(Some(m)),
        Some(_) => Err(PolicyError::invalid(name, "expected a mapping")),
    }
}

/// Render a YAML scalar as a string. Sequences and mappings are rejected.
fn scalar(section: &'static str, value: &Value) -> Result<String, PolicyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(PolicyError::invalid(
            section,
            format!("expected a scalar, found {other:?}"),
        )),
    }
}

fn parse_requirements(section: &'static str, map: &Mapping) -> Result<Vec<Requirement>, PolicyError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(map.len());
    for (k, v) in map {
        let key = scalar(section, k)?;
        let value = scalar(section, v)?;
        let requirement = Requirement::new(&key, &value)
            .map_err(|e| PolicyError::invalid(section, format!("requirement {key:?}: {e}")))?;
        if !seen.insert(requirement.key.clone()) {
            return Err(PolicyError::invalid(
                section,
                format!("duplicate key {}", requirement.key),
            ));
        }
        out.push(requirement);
    }
    Ok(out)
}

fn parse_triggers(map: &Mapping) -> Result<Vec<StateTrigger>, PolicyError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(map.len());
    for (k, v) in map {
        let state = scalar(STATE_TRIGGERS, k)?.trim().to_string();
        if state.is_empty() {
            return Err(PolicyError::invalid(STATE_TRIGGERS, "state name can't be blank"));
        }
        if !seen.insert(state.clone()) {
            return Err(PolicyError::invalid(
                STATE_TRIGGERS,
                format!("duplicate state {state:?}"),
            ));
        }

        let raw_keys = match v {
            Value::Sequence(items) => items
                .iter()
                .map(|item| scalar(STATE_TRIGGERS, item))
                .collect::<Result<Vec<_>, _>>()?,
            Value::Null => Vec::new(),
            single => vec![scalar(STATE_TRIGGERS, single)?],
        };
        if raw_keys.is_empty() {
            return Err(PolicyError::invalid(
                STATE_TRIGGERS,
                format!("state {state:?} has no trigger keys"),
            ));
        }

        let keys = raw_keys
            .iter()
            .map(|raw| {
                LabelKey::new(raw).map_err(|e| {
                    PolicyError::invalid(STATE_TRIGGERS, format!("state {state:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.push(StateTrigger { state, keys });
    }
    Ok(out)
}

fn parse_levels(map: &Mapping) -> Result<Vec<LevelRule>, PolicyError> {
    let mut out: Vec<LevelRule> = Vec::with_capacity(map.len());
    for (k, v) in map {
        let raw_level = scalar(LEVEL_RULES, k)?;
        let level: u32 = raw_level
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                PolicyError::invalid(
                    LEVEL_RULES,
                    format!("level {raw_level:?} is not a positive integer"),
                )
            })?;
        if out.iter().any(|rung| rung.level == level) {
            return Err(PolicyError::invalid(LEVEL_RULES, format!("duplicate level {level}")));
        }

        let requirements = match v {
            Value::Mapping(m) => parse_requirements(LEVEL_RULES, m)?,
            _ => {
                return Err(PolicyError::invalid(
                    LEVEL_RULES,
                    format!("level {level} must map keys to values"),
                ))
            }
        };
        if requirements.is_empty() {
            return Err(PolicyError::invalid(
                LEVEL_RULES,
                format!("level {level} has no requirements"),
            ));
        }
        out.push(LevelRule { level, requirements });
    }
    out.sort_by_key(|rung| rung.level);
    Ok(out)
}
