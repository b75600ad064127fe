//! # Error Types — Label and Identifier Validation
//!
//! All validation failures use `thiserror` for derive-based `Display` and
//! `Error` implementations. Each variant names the offending field so callers
//! can report which part of a label was rejected.

use thiserror::Error;

/// Minimum length of a label key or value, in characters.
pub const MIN_LABEL_LENGTH: usize = 3;

/// Maximum length of a label key or value, in characters.
pub const MAX_LABEL_LENGTH: usize = 255;

/// Validation failure for a label field or a domain identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field was empty after normalization.
    #[error("{field} can't be blank")]
    Blank {
        /// Field name (`key` or `value`).
        field: &'static str,
    },

    /// Field length fell outside `[3, 255]`.
    #[error("{field} length {length} is outside [3, 255]")]
    Length {
        /// Field name (`key` or `value`).
        field: &'static str,
        /// Length after normalization.
        length: usize,
    },

    /// Field contained characters outside `[a-z0-9_-]`.
    #[error("{field} is invalid: {value:?} must match ^[a-z0-9_-]+$")]
    Format {
        /// Field name (`key` or `value`).
        field: &'static str,
        /// The normalized value that failed.
        value: String,
    },

    /// Scope was neither `public` nor `private`.
    #[error("scope is invalid: {0:?} (expected public or private)")]
    Scope(String),

    /// Account UID did not match `ID` followed by 10 upper-case hex digits.
    #[error("invalid uid: {0:?}")]
    Uid(String),
}
