//! # ident-state — Label-Driven State & Trust-Level Engine
//!
//! Recomputes an account's lifecycle `state` and trust `level` from its
//! private labels whenever a label mutation commits.
//!
//! ## Data Flow
//!
//! ```text
//! label mutation committed
//!        │
//!        ▼
//! FactProjection (private labels, rebuilt fresh)
//!        │
//!        ├──▶ resolve_state ──▶ account.state  (written only if changed)
//!        └──▶ resolve_level ──▶ account.level  (written only if changed)
//!        │
//!        ▼
//! document-review notification (key `document`, value verified/rejected)
//! ```
//!
//! No stage calls back into an earlier one. Resolution is a pure function of
//! the current facts and the current policy, so running it twice against the
//! same inputs yields the same result and missed events cannot cause drift.
//!
//! ## Modules
//!
//! - **Facts** (`facts.rs`): private-scope key→value projection.
//! - **Resolver** (`resolver.rs`): the single first-match rule algorithm,
//!   used for both state and level.
//! - **Publisher** (`publisher.rs`): outbound event collaborator.
//! - **Recompute** (`recompute.rs`): the post-commit trigger.
//! - **Store** (`store.rs`): in-memory account/label persistence that drives
//!   the trigger after each commit, serialized per account.

pub mod facts;
pub mod publisher;
pub mod recompute;
pub mod resolver;
pub mod store;

pub use facts::FactProjection;
pub use publisher::{
    EventPublisher, NoopPublisher, PublishError, PublishedEvent, RecordingPublisher,
    TracingPublisher, DOCUMENT_REJECTED_EVENT, DOCUMENT_VERIFIED_EVENT,
};
pub use recompute::{
    AccountRecord, Change, LabelMutation, Notification, RecomputeError, RecomputeOutcome,
    Recomputer, DOCUMENT_KEY,
};
pub use resolver::{resolve, resolve_level, resolve_state};
pub use store::{LabelCommit, LabelStore, LabelUpdate, StoreError};
