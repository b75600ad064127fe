//! # Policy Errors
//!
//! Failures loading or validating the rule configuration. A policy error
//! aborts a recomputation without touching account state.

use std::path::PathBuf;

use thiserror::Error;

/// Error produced while obtaining a [`PolicyConfig`](crate::PolicyConfig).
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document was not valid YAML.
    #[error("failed to parse policy: {0}")]
    Parse(String),

    /// The document parsed but a section is malformed.
    #[error("invalid policy section {section}: {message}")]
    Invalid {
        /// Top-level section name.
        section: &'static str,
        /// What was wrong.
        message: String,
    },

    /// The source could not supply a configuration at all.
    #[error("policy source unavailable: {0}")]
    Unavailable(String),
}

impl PolicyError {
    pub(crate) fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            section,
            message: message.into(),
        }
    }
}
