//! # Identity Newtypes
//!
//! Identifiers for accounts and labels. Each identifier is a distinct type;
//! you cannot pass a [`LabelId`] where an [`AccountId`] is expected.
//!
//! [`AccountId`] and [`LabelId`] are internal UUID keys. [`Uid`] is the
//! public account identifier that appears in event payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Internal identifier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Create a new random account identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an account identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// Internal identifier of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(Uuid);

impl LabelId {
    /// Create a new random label identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LabelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public account identifier: `ID` followed by 10 upper-case hex digits,
/// e.g. `ID5A3F09C2B1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Uid(String);

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl Uid {
    const PREFIX: &'static str = "ID";
    const HEX_DIGITS: usize = 10;

    /// Parse a UID, validating its format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let valid = s
            .strip_prefix(Self::PREFIX)
            .map(|hex| {
                hex.len() == Self::HEX_DIGITS
                    && hex
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
            .unwrap_or(false);
        if !valid {
            return Err(ValidationError::Uid(s));
        }
        Ok(Self(s))
    }

    /// Generate a fresh random UID.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(format!("{}{}", Self::PREFIX, &hex[..Self::HEX_DIGITS]))
    }

    /// Access the UID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
