//! # Event Publishing
//!
//! Outbound notifications are fire-and-forget from the engine's point of
//! view: a publish failure is reported in the recomputation outcome and
//! logged, but never undoes a state or level write.

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

/// Published when a `document` label is set to `verified`.
pub const DOCUMENT_VERIFIED_EVENT: &str = "system.document.verified";

/// Published when a `document` label is set to `rejected`.
pub const DOCUMENT_REJECTED_EVENT: &str = "system.document.rejected";

/// Failure delivering an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The transport is not reachable.
    #[error("event transport unavailable: {0}")]
    Unavailable(String),

    /// The transport refused the event.
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Outbound event collaborator.
pub trait EventPublisher: Send + Sync + std::fmt::Debug {
    /// Deliver `payload` under `event`.
    fn publish(&self, event: &str, payload: &serde_json::Value) -> Result<(), PublishError>;
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        tracing::info!(event, %payload, "event published");
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: &str, _payload: &serde_json::Value) -> Result<(), PublishError> {
        Ok(())
    }
}

/// An event captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedEvent {
    /// Event name.
    pub event: String,
    /// Event payload.
    pub payload: serde_json::Value,
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PublishedEvent>>,
}

impl RecordingPublisher {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of events published so far, oldest first.
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<PublishedEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        self.events.lock().push(PublishedEvent {
            event: event.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recorder_keeps_order_and_drains() {
        let recorder = RecordingPublisher::new();
        recorder.publish("a.first", &json!({ "n": 1 })).unwrap();
        recorder.publish("a.second", &json!({ "n": 2 })).unwrap();

        let names: Vec<_> = recorder.events().into_iter().map(|e| e.event).collect();
        assert_eq!(names, ["a.first", "a.second"]);

        assert_eq!(recorder.take().len(), 2);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn tracing_and_noop_publishers_accept_events() {
        assert!(TracingPublisher.publish(DOCUMENT_VERIFIED_EVENT, &json!({})).is_ok());
        assert!(NoopPublisher.publish(DOCUMENT_REJECTED_EVENT, &json!({})).is_ok());
    }
}
