//! # Recomputation Trigger
//!
//! Invoked by the persistence layer after a label mutation has committed.
//! Rebuilds the fact projection, resolves state and level against the
//! policy in force, writes each field only when it changed, and announces
//! document-review outcomes.
//!
//! ## Scope Gate
//!
//! Only mutations that touch the private scope recompute:
//!
//! | Mutation  | Recomputes when                                     |
//! |-----------|-----------------------------------------------------|
//! | Created   | the label is private                                |
//! | Updated   | the label is private now, or was private before     |
//! | Destroyed | the label was private                               |
//!
//! ## Failure Semantics
//!
//! The label mutation is already committed when the trigger runs. A policy
//! failure aborts the recomputation before any field is written and is
//! returned to the caller; the account keeps its last resolved values until
//! the next successful recomputation reconciles them. The document-review
//! notification is still published in that case, since reconciliation never
//! re-announces. A publish failure is reported in the outcome and logged,
//! never propagated.

use std::sync::Arc;

use ident_core::{AccountId, Label, LabelScope};
use ident_policy::{PolicyError, PolicySource};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::facts::FactProjection;
use crate::publisher::{EventPublisher, DOCUMENT_REJECTED_EVENT, DOCUMENT_VERIFIED_EVENT};
use crate::resolver::{resolve_level, resolve_state};

/// Reserved key whose review outcomes are announced.
pub const DOCUMENT_KEY: &str = "document";

/// The account surface the trigger reads and writes.
pub trait AccountRecord {
    /// Internal identifier, for logging.
    fn account_id(&self) -> AccountId;
    /// Private facts as of now.
    fn current_private_facts(&self) -> FactProjection;
    /// Current lifecycle state.
    fn state(&self) -> &str;
    /// Current trust level.
    fn level(&self) -> u32;
    /// Persist a new lifecycle state.
    fn set_state(&mut self, state: &str);
    /// Persist a new trust level.
    fn set_level(&mut self, level: u32);
    /// Public identity payload for outbound events.
    fn event_payload(&self) -> serde_json::Value;
}

/// A committed label mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMutation {
    /// A label was created.
    Created(Label),
    /// A label's value and/or scope changed.
    Updated {
        /// The label as committed.
        label: Label,
        /// Scope before the update.
        previous_scope: LabelScope,
    },
    /// A label was destroyed. Holds the label as it was.
    Destroyed(Label),
}

impl LabelMutation {
    /// The label this mutation concerns.
    pub fn label(&self) -> &Label {
        match self {
            Self::Created(label) | Self::Destroyed(label) => label,
            Self::Updated { label, .. } => label,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated { .. } => "updated",
            Self::Destroyed(_) => "destroyed",
        }
    }

    /// Whether this mutation touches the private scope.
    pub fn triggers_recompute(&self) -> bool {
        match self {
            Self::Created(label) | Self::Destroyed(label) => label.is_private(),
            Self::Updated {
                label,
                previous_scope,
            } => label.is_private() || previous_scope.is_private(),
        }
    }

    /// Document-review event to announce, if any.
    ///
    /// Destroyed labels never announce a review outcome.
    pub fn document_review_event(&self) -> Option<&'static str> {
        let label = match self {
            Self::Created(label) | Self::Updated { label, .. } => label,
            Self::Destroyed(_) => return None,
        };
        if label.key.as_str() != DOCUMENT_KEY {
            return None;
        }
        match label.value.as_str() {
            "verified" => Some(DOCUMENT_VERIFIED_EVENT),
            "rejected" => Some(DOCUMENT_REJECTED_EVENT),
            _ => None,
        }
    }
}

/// A field transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change<T> {
    /// Value before.
    pub from: T,
    /// Value after.
    pub to: T,
}

/// Status of the document-review notification for one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Notification {
    /// The mutation does not announce anything.
    #[default]
    NotApplicable,
    /// The event was delivered.
    Published {
        /// Event name.
        event: &'static str,
    },
    /// Delivery failed; state and level writes stand.
    Failed {
        /// Event name.
        event: &'static str,
        /// Publisher error message.
        reason: String,
    },
}

/// What one trigger invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeOutcome {
    /// Whether the scope gate let resolution run.
    pub recomputed: bool,
    /// State transition, if the state changed.
    pub state: Option<Change<String>>,
    /// Level transition, if the level changed.
    pub level: Option<Change<u32>>,
    /// Document-review notification status.
    pub notification: Notification,
}

impl RecomputeOutcome {
    /// Whether state or level was written.
    pub fn changed(&self) -> bool {
        self.state.is_some() || self.level.is_some()
    }
}

/// Recomputation failure. The label mutation that triggered it stays
/// committed.
#[derive(Error, Debug)]
pub enum RecomputeError {
    /// The policy could not be loaded or validated.
    #[error("policy unavailable during recomputation: {0}")]
    Policy(#[from] PolicyError),
}

/// Post-commit trigger wiring the policy source and event publisher.
#[derive(Debug, Clone)]
pub struct Recomputer {
    policy: Arc<dyn PolicySource>,
    publisher: Arc<dyn EventPublisher>,
}

impl Recomputer {
    /// Build a trigger over the given collaborators.
    pub fn new(policy: Arc<dyn PolicySource>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { policy, publisher }
    }

    /// Resolve state and level for `account` from its current facts, writing
    /// each only if it changed. Runs regardless of any scope gate.
    pub fn reconcile(&self, account: &mut dyn AccountRecord) -> Result<RecomputeOutcome, RecomputeError> {
        let policy = self.policy.load()?;

        let facts = account.current_private_facts();
        let state = resolve_state(&facts, &policy);
        let level = resolve_level(&facts, &policy);

        let mut outcome = RecomputeOutcome {
            recomputed: true,
            ..RecomputeOutcome::default()
        };

        if state != account.state() {
            let from = account.state().to_string();
            account.set_state(&state);
            tracing::info!(account = %account.account_id(), %from, to = %state, "account state changed");
            outcome.state = Some(Change { from, to: state });
        }

        let previous_level = account.level();
        if level != previous_level {
            account.set_level(level);
            tracing::info!(account = %account.account_id(), from = previous_level, to = level, "account level changed");
            outcome.level = Some(Change {
                from: previous_level,
                to: level,
            });
        }

        Ok(outcome)
    }

    /// React to a committed label mutation.
    pub fn on_label_committed(
        &self,
        account: &mut dyn AccountRecord,
        mutation: &LabelMutation,
    ) -> Result<RecomputeOutcome, RecomputeError> {
        let label = mutation.label();
        tracing::debug!(
            account = %account.account_id(),
            mutation = mutation.kind(),
            key = %label.key,
            scope = %label.scope,
            "label mutation committed"
        );

        let account_id = account.account_id();
        let recomputed = if mutation.triggers_recompute() {
            self.reconcile(account).map_err(|e| {
                tracing::warn!(account = %account_id, error = %e, "recomputation aborted");
                e
            })
        } else {
            Ok(RecomputeOutcome::default())
        };

        // The review outcome is announced even when recomputation failed; the
        // payload then carries the last resolved state and level.
        let notification = match mutation.document_review_event() {
            Some(event) => self.notify_document_review(&*account, label, event),
            None => Notification::NotApplicable,
        };

        let mut outcome = recomputed?;
        outcome.notification = notification;
        Ok(outcome)
    }

    fn notify_document_review(
        &self,
        account: &dyn AccountRecord,
        label: &Label,
        event: &'static str,
    ) -> Notification {
        let payload = json!({
            "record": {
                "user": account.event_payload(),
                "label": {
                    "key": label.key.as_str(),
                    "value": label.value.as_str(),
                    "scope": label.scope.as_str(),
                },
            }
        });

        match self.publisher.publish(event, &payload) {
            Ok(()) => Notification::Published { event },
            Err(e) => {
                tracing::warn!(account = %account.account_id(), event, error = %e, "document review notification failed");
                Notification::Failed {
                    event,
                    reason: e.to_string(),
                }
            }
        }
    }
}
