//! # Replay Subcommand
//!
//! Drives a scripted sequence of label mutations through an in-memory
//! [`LabelStore`] so operators can see exactly which state and level
//! transitions, and which document-review events, a policy produces.
//!
//! ```yaml
//! email: someone@example.com
//! steps:
//!   - { op: create, key: phone, value: verified }
//!   - { op: create, key: document, value: verified, scope: private }
//!   - { op: update, key: phone, value: rejected }
//!   - { op: update, key: phone, new_scope: public }
//!   - { op: destroy, key: document }
//! ```
//!
//! `scope` selects the label a step operates on and defaults to `private`.
//! A step the store rejects (validation, uniqueness, unknown label) is
//! reported and the script continues; the exit code is then 1. A policy
//! failure during recomputation aborts the replay.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use ident_core::{AccountId, LabelScope};
use ident_state::{
    LabelCommit, LabelStore, LabelUpdate, Notification, RecomputeOutcome, Recomputer, StoreError,
    TracingPublisher,
};
use serde::{Deserialize, Serialize};

use crate::policy_source;

/// Arguments for the `ident replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Replay script YAML file.
    pub script: PathBuf,

    /// Policy YAML file. Defaults to `IDENT_POLICY_PATH`. Re-read before
    /// every recomputation.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Print step results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Email of the account the script runs against.
    #[serde(default = "default_email")]
    pub email: String,
    /// Mutations, applied in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_email() -> String {
    "replay@example.com".to_string()
}

fn private_scope() -> LabelScope {
    LabelScope::Private
}

/// One label mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Create a label.
    Create {
        key: String,
        value: String,
        #[serde(default = "private_scope")]
        scope: LabelScope,
    },
    /// Change the value and/or scope of the label at `(key, scope)`.
    Update {
        key: String,
        #[serde(default = "private_scope")]
        scope: LabelScope,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        new_scope: Option<LabelScope>,
    },
    /// Destroy the label at `(key, scope)`.
    Destroy {
        key: String,
        #[serde(default = "private_scope")]
        scope: LabelScope,
    },
}

impl Step {
    fn target(&self) -> (&str, LabelScope) {
        match self {
            Self::Create { key, scope, .. }
            | Self::Update { key, scope, .. }
            | Self::Destroy { key, scope } => (key.as_str(), *scope),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Create { key, value, scope } => format!("create {key}={value}@{scope}"),
            Self::Update {
                key,
                scope,
                value,
                new_scope,
            } => {
                let mut s = format!("update {key}@{scope}");
                if let Some(value) = value {
                    s.push_str(&format!(" value={value}"));
                }
                if let Some(new_scope) = new_scope {
                    s.push_str(&format!(" scope={new_scope}"));
                }
                s
            }
            Self::Destroy { key, scope } => format!("destroy {key}@{scope}"),
        }
    }
}

/// What happened at one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// One-based step number.
    pub step: usize,
    /// Human-readable description of the step.
    pub action: String,
    /// Recomputation outcome, when the mutation committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RecomputeOutcome>,
    /// Rejection reason, when the store refused the mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
    /// Account state after the step.
    pub state: String,
    /// Account level after the step.
    pub level: u32,
}

/// Execute the replay subcommand.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let script = read_script(&args.script)?;
    let source = policy_source(args.policy.as_deref())?;
    let recomputer = Recomputer::new(Arc::new(source), Arc::new(TracingPublisher));
    let store = LabelStore::new(recomputer);

    let reports = replay(&store, &script)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", render(report));
        }
    }

    let rejected = reports.iter().filter(|r| r.rejected.is_some()).count();
    if rejected > 0 {
        tracing::warn!(rejected, "replay finished with rejected steps");
        return Ok(1);
    }
    Ok(0)
}

fn read_script(path: &Path) -> Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read replay script {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse replay script {}", path.display()))
}

/// Run every step of `script` against a fresh account in `store`.
pub fn replay(store: &LabelStore, script: &Script) -> Result<Vec<StepReport>> {
    let account = store.create_account(script.email.as_str()).id;
    let mut reports = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        let (outcome, rejected) = match apply(store, account, step) {
            Ok(Some(commit)) => (Some(commit.outcome), None),
            Ok(None) => {
                let (key, scope) = step.target();
                (None, Some(format!("no {scope} label with key {key}")))
            }
            Err(err @ StoreError::Recompute { .. }) => {
                return Err(err).with_context(|| format!("step {} aborted the replay", index + 1));
            }
            Err(err) => (None, Some(err.to_string())),
        };
        let snapshot = store.account(account)?;
        reports.push(StepReport {
            step: index + 1,
            action: step.describe(),
            outcome,
            rejected,
            state: snapshot.state,
            level: snapshot.level,
        });
    }
    Ok(reports)
}

/// Apply one step. `Ok(None)` means the step names a label that does not
/// exist.
fn apply(
    store: &LabelStore,
    account: AccountId,
    step: &Step,
) -> Result<Option<LabelCommit>, StoreError> {
    match step {
        Step::Create { key, value, scope } => {
            store.create_label(account, key, value, *scope).map(Some)
        }
        Step::Update {
            key,
            scope,
            value,
            new_scope,
        } => {
            let Some(label) = store.find_label(account, key, *scope)? else {
                return Ok(None);
            };
            let update = LabelUpdate {
                value: value.clone(),
                scope: *new_scope,
            };
            store.update_label(account, label.id, update).map(Some)
        }
        Step::Destroy { key, scope } => {
            let Some(label) = store.find_label(account, key, *scope)? else {
                return Ok(None);
            };
            store.destroy_label(account, label.id).map(Some)
        }
    }
}

fn render(report: &StepReport) -> String {
    let mut line = format!("{:>3}  {:<40}", report.step, report.action);
    if let Some(reason) = &report.rejected {
        line.push_str(&format!("  REJECTED: {reason}"));
        return line;
    }
    if let Some(outcome) = &report.outcome {
        match &outcome.state {
            Some(change) => line.push_str(&format!("  state {} -> {}", change.from, change.to)),
            None => line.push_str(&format!("  state {}", report.state)),
        }
        match &outcome.level {
            Some(change) => line.push_str(&format!("  level {} -> {}", change.from, change.to)),
            None => line.push_str(&format!("  level {}", report.level)),
        }
        if !outcome.recomputed {
            line.push_str("  (not recomputed)");
        }
        match &outcome.notification {
            Notification::NotApplicable => {}
            Notification::Published { event } => line.push_str(&format!("  event {event}")),
            Notification::Failed { event, reason } => {
                line.push_str(&format!("  event {event} FAILED: {reason}"))
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use ident_policy::StaticPolicySource;
    use ident_state::RecordingPublisher;

    const POLICY: &str = r#"
activation_requirements:
  phone: verified
  documents: verified
state_triggers:
  locked: [trade, withdraw]
level_rules:
  1: { phone: verified }
  2: { documents: verified }
"#;

    fn store() -> (LabelStore, Arc<RecordingPublisher>) {
        let policy = Arc::new(StaticPolicySource::from_yaml_str(POLICY).unwrap());
        let publisher = Arc::new(RecordingPublisher::new());
        let store = LabelStore::new(Recomputer::new(policy, publisher.clone()));
        (store, publisher)
    }

    fn script(yaml: &str) -> Script {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn script_defaults() {
        let s = script("steps:\n  - { op: destroy, key: phone }\n");
        assert_eq!(s.email, "replay@example.com");
        assert!(matches!(
            &s.steps[0],
            Step::Destroy { scope: LabelScope::Private, .. }
        ));
    }

    #[test]
    fn replay_reports_transitions() {
        let (store, _) = store();
        let s = script(
            r#"
steps:
  - { op: create, key: phone, value: verified }
  - { op: create, key: documents, value: verified }
  - { op: destroy, key: phone }
"#,
        );
        let reports = replay(&store, &s).unwrap();
        let states: Vec<_> = reports.iter().map(|r| r.state.as_str()).collect();
        assert_eq!(states, ["pending", "active", "pending"]);
        let levels: Vec<_> = reports.iter().map(|r| r.level).collect();
        assert_eq!(levels, [1, 2, 0]);
    }

    #[test]
    fn rejected_steps_do_not_stop_the_replay() {
        let (store, _) = store();
        let s = script(
            r#"
steps:
  - { op: create, key: trade, value: blocked }
  - { op: create, key: Trade, value: again }
  - { op: update, key: withdraw, value: blocked }
  - { op: update, key: trade, new_scope: public }
"#,
        );
        let reports = replay(&store, &s).unwrap();
        assert_eq!(reports[0].state, "locked");
        assert!(reports[1].rejected.as_deref().unwrap().contains("already been taken"));
        assert!(reports[2].rejected.is_some());
        assert!(reports[3].rejected.is_none());
        assert_eq!(reports[3].state, "pending");
    }

    #[test]
    fn document_review_is_published() {
        let (store, publisher) = store();
        let s = script("steps:\n  - { op: create, key: document, value: rejected }\n");
        let reports = replay(&store, &s).unwrap();
        assert_eq!(
            reports[0].outcome.as_ref().unwrap().notification,
            Notification::Published {
                event: ident_state::DOCUMENT_REJECTED_EVENT
            }
        );
        assert_eq!(publisher.events().len(), 1);
    }

    #[test]
    fn run_replay_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        std::fs::write(&policy, POLICY).unwrap();

        let ok = dir.path().join("ok.yaml");
        std::fs::write(&ok, "steps:\n  - { op: create, key: phone, value: verified }\n").unwrap();
        let args = ReplayArgs {
            script: ok,
            policy: Some(policy.clone()),
            json: false,
        };
        assert_eq!(run_replay(&args).unwrap(), 0);

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "steps:\n  - { op: destroy, key: phone }\n").unwrap();
        let args = ReplayArgs {
            script: bad,
            policy: Some(policy),
            json: true,
        };
        assert_eq!(run_replay(&args).unwrap(), 1);
    }

    #[test]
    fn invalid_policy_aborts_replay() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        std::fs::write(&policy, "level_rules:\n  0: { phone: verified }\n").unwrap();
        let script_path = dir.path().join("script.yaml");
        std::fs::write(
            &script_path,
            "steps:\n  - { op: create, key: phone, value: verified }\n",
        )
        .unwrap();
        let args = ReplayArgs {
            script: script_path,
            policy: Some(policy),
            json: false,
        };
        assert!(run_replay(&args).is_err());
    }
}
