//! # Labels
//!
//! A label is a typed key/value fact attached to an account, such as
//! `phone=verified` or `document=rejected`. Labels in the `private` scope
//! drive the account's lifecycle state and trust level; `public` labels are
//! informational only.
//!
//! ## Normalization
//!
//! Keys and values are normalized before validation: surrounding whitespace
//! is trimmed, internal whitespace runs collapse to a single space, and the
//! result is lower-cased. `"  Email  "` is stored as `"email"`.
//!
//! ## Validation
//!
//! After normalization a key or value must be non-empty, between 3 and 255
//! characters, and match `^[a-z0-9_-]+$`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, MAX_LABEL_LENGTH, MIN_LABEL_LENGTH};
use crate::identity::{AccountId, LabelId};

/// Trim, collapse internal whitespace runs to one space, and lower-case.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn validate_field(field: &'static str, normalized: &str) -> Result<(), ValidationError> {
    if normalized.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    let length = normalized.chars().count();
    if !(MIN_LABEL_LENGTH..=MAX_LABEL_LENGTH).contains(&length) {
        return Err(ValidationError::Length { field, length });
    }
    let well_formed = normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !well_formed {
        return Err(ValidationError::Format {
            field,
            value: normalized.to_string(),
        });
    }
    Ok(())
}

macro_rules! label_field {
    ($(#[$meta:meta])* $ty:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $ty(String);

        impl $ty {
            /// Normalize and validate a raw string.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
                let normalized = normalize(raw.as_ref());
                validate_field($field, &normalized)?;
                Ok(Self(normalized))
            }

            /// Access the normalized string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

label_field!(
    /// Normalized label key.
    LabelKey,
    "key"
);

label_field!(
    /// Normalized label value.
    LabelValue,
    "value"
);

/// Visibility scope of a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelScope {
    /// Visible to the account owner; never consulted by the state engine.
    #[default]
    Public,
    /// Administrative fact; feeds state and level recomputation.
    Private,
}

impl LabelScope {
    /// The scope's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Whether this is the private scope.
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }
}

impl fmt::Display for LabelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LabelScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(ValidationError::Scope(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LabelScope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single fact attached to an account.
///
/// `(account_id, key, scope)` is unique across an account's labels; the
/// owning store enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label identifier.
    pub id: LabelId,
    /// Owning account.
    pub account_id: AccountId,
    /// Normalized key.
    pub key: LabelKey,
    /// Normalized value.
    pub value: LabelValue,
    /// Visibility scope.
    pub scope: LabelScope,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Label {
    /// Build a new label from raw inputs, normalizing and validating them.
    pub fn new(
        account_id: AccountId,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
        scope: LabelScope,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        Ok(Self {
            id: LabelId::new(),
            account_id,
            key: LabelKey::new(key)?,
            value: LabelValue::new(value)?,
            scope,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether this label is in the private scope.
    pub fn is_private(&self) -> bool {
        self.scope.is_private()
    }
}
