//! # Account Records
//!
//! The account is owned by the surrounding identity service. The state
//! engine reads its private labels and writes exactly two fields: `state`
//! and `level`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::identity::{AccountId, Uid};

/// State of a freshly created account, and the fallback when no rule matches.
pub const DEFAULT_STATE: &str = "pending";

/// Level of a freshly created account, and the fallback when no level rule matches.
pub const DEFAULT_LEVEL: u32 = 0;

/// Role assigned to new accounts.
pub const DEFAULT_ROLE: &str = "member";

/// An identity account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier.
    pub id: AccountId,
    /// Public identifier.
    pub uid: Uid,
    /// Login email.
    pub email: String,
    /// Authorization role.
    pub role: String,
    /// Lifecycle state, written by the state resolver.
    pub state: String,
    /// Trust level, written by the level resolver.
    pub level: u32,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new `pending` account at level 0.
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            uid: Uid::generate(),
            email: email.into(),
            role: DEFAULT_ROLE.to_string(),
            state: DEFAULT_STATE.to_string(),
            level: DEFAULT_LEVEL,
            created_at: now,
            updated_at: now,
        }
    }

    /// Public identity payload attached to outbound events.
    ///
    /// Internal identifiers are deliberately absent.
    pub fn event_payload(&self) -> serde_json::Value {
        json!({
            "uid": self.uid.as_str(),
            "email": self.email,
            "role": self.role,
            "level": self.level,
            "state": self.state,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_is_pending_at_level_zero() {
        let account = Account::new("alice@example.com");
        assert_eq!(account.state, "pending");
        assert_eq!(account.level, 0);
        assert_eq!(account.role, "member");
    }

    #[test]
    fn event_payload_exposes_public_fields_only() {
        let account = Account::new("bob@example.com");
        let payload = account.event_payload();
        assert_eq!(payload["uid"], account.uid.as_str());
        assert_eq!(payload["email"], "bob@example.com");
        assert_eq!(payload["state"], "pending");
        assert_eq!(payload["level"], 0);
        assert!(payload.get("id").is_none());
    }
}
