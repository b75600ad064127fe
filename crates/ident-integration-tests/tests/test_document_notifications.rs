//! # Document Review Notification Test
//!
//! A `document` label set to `verified` or `rejected` announces the review
//! outcome through the event publisher, whatever its scope. Publish
//! failures are reported but never undo state or level writes.

use std::sync::Arc;

use ident_core::LabelScope;
use ident_policy::{PolicyConfig, PolicyError, PolicySource, StaticPolicySource};
use ident_state::{
    EventPublisher, LabelStore, LabelUpdate, Notification, PublishError, Recomputer,
    RecordingPublisher, StoreError, DOCUMENT_REJECTED_EVENT, DOCUMENT_VERIFIED_EVENT,
};

const POLICY: &str = r#"
activation_requirements:
  document: verified
level_rules:
  1: { document: verified }
"#;

#[derive(Debug)]
struct UnreachablePublisher;

impl EventPublisher for UnreachablePublisher {
    fn publish(&self, _event: &str, _payload: &serde_json::Value) -> Result<(), PublishError> {
        Err(PublishError::Unavailable("broker offline".into()))
    }
}

#[derive(Debug)]
struct OfflinePolicy;

impl PolicySource for OfflinePolicy {
    fn load(&self) -> Result<PolicyConfig, PolicyError> {
        Err(PolicyError::Unavailable("config store offline".into()))
    }
}

fn setup() -> (LabelStore, Arc<RecordingPublisher>) {
    let policy = Arc::new(StaticPolicySource::from_yaml_str(POLICY).unwrap());
    let publisher = Arc::new(RecordingPublisher::new());
    let store = LabelStore::new(Recomputer::new(policy, publisher.clone()));
    (store, publisher)
}

#[test]
fn verified_document_publishes_with_account_payload() {
    let (store, publisher) = setup();
    let account = store.create_account("doc@example.com");

    let commit = store
        .create_label(account.id, "document", "verified", LabelScope::Private)
        .unwrap();
    assert_eq!(
        commit.outcome.notification,
        Notification::Published {
            event: DOCUMENT_VERIFIED_EVENT
        }
    );

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "system.document.verified");
    let record = &events[0].payload["record"];
    assert_eq!(record["user"]["uid"], account.uid.as_str());
    assert_eq!(record["user"]["email"], "doc@example.com");
    assert_eq!(record["label"]["key"], "document");
    assert_eq!(record["label"]["value"], "verified");
    assert_eq!(record["label"]["scope"], "private");
}

#[test]
fn payload_reflects_the_recomputed_account() {
    let (store, publisher) = setup();
    let id = store.create_account("doc@example.com").id;
    store
        .create_label(id, "document", "verified", LabelScope::Private)
        .unwrap();

    let user = &publisher.events()[0].payload["record"]["user"];
    assert_eq!(user["state"], "active");
    assert_eq!(user["level"], 1);
}

#[test]
fn rejected_document_update_publishes_rejection() {
    let (store, publisher) = setup();
    let id = store.create_account("doc@example.com").id;
    let doc = store
        .create_label(id, "document", "pending", LabelScope::Private)
        .unwrap();
    assert_eq!(doc.outcome.notification, Notification::NotApplicable);
    assert!(publisher.events().is_empty());

    store
        .update_label(
            id,
            doc.label.id,
            LabelUpdate {
                value: Some("rejected".into()),
                scope: None,
            },
        )
        .unwrap();
    let names: Vec<_> = publisher.take().into_iter().map(|e| e.event).collect();
    assert_eq!(names, [DOCUMENT_REJECTED_EVENT]);
}

#[test]
fn public_document_label_still_publishes() {
    let (store, publisher) = setup();
    let id = store.create_account("doc@example.com").id;
    let commit = store
        .create_label(id, "document", "verified", LabelScope::Public)
        .unwrap();
    assert!(!commit.outcome.recomputed);
    assert_eq!(publisher.events().len(), 1);
    assert_eq!(store.account(id).unwrap().state, "pending");
}

#[test]
fn destroying_a_document_label_publishes_nothing() {
    let (store, publisher) = setup();
    let id = store.create_account("doc@example.com").id;
    let doc = store
        .create_label(id, "document", "verified", LabelScope::Private)
        .unwrap();
    publisher.take();

    store.destroy_label(id, doc.label.id).unwrap();
    assert!(publisher.events().is_empty());
    assert_eq!(store.account(id).unwrap().state, "pending");
}

#[test]
fn publish_failure_keeps_state_writes() {
    let policy = Arc::new(StaticPolicySource::from_yaml_str(POLICY).unwrap());
    let store = LabelStore::new(Recomputer::new(policy, Arc::new(UnreachablePublisher)));
    let id = store.create_account("doc@example.com").id;

    let commit = store
        .create_label(id, "document", "verified", LabelScope::Private)
        .unwrap();
    match commit.outcome.notification {
        Notification::Failed { event, reason } => {
            assert_eq!(event, DOCUMENT_VERIFIED_EVENT);
            assert!(reason.contains("broker offline"));
        }
        other => panic!("expected failed notification, got {other:?}"),
    }
    let account = store.account(id).unwrap();
    assert_eq!(account.state, "active");
    assert_eq!(account.level, 1);
}

#[test]
fn policy_failure_does_not_swallow_document_review() {
    let publisher = Arc::new(RecordingPublisher::new());
    let store = LabelStore::new(Recomputer::new(Arc::new(OfflinePolicy), publisher.clone()));
    let id = store.create_account("doc@example.com").id;

    let err = store
        .create_label(id, "document", "verified", LabelScope::Private)
        .unwrap_err();
    assert!(matches!(err, StoreError::Recompute { .. }));
    assert_eq!(store.labels(id, None).unwrap().len(), 1);

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, DOCUMENT_VERIFIED_EVENT);
    assert_eq!(events[0].payload["record"]["user"]["state"], "pending");

    // A later reconcile does not announce the same review twice.
    assert!(store.reconcile(id).is_err());
    assert_eq!(publisher.events().len(), 1);
}
