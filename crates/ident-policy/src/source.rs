//! # Policy Sources
//!
//! The engine never caches rules: every recomputation calls
//! [`PolicySource::load`] and works against whatever configuration is current
//! at that moment. Implementations decide where the configuration lives.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::PolicyConfig;
use crate::error::PolicyError;

/// Environment variable naming the policy file for [`FilePolicySource::from_env`].
pub const POLICY_PATH_ENV: &str = "IDENT_POLICY_PATH";

/// Supplies the current rule configuration.
pub trait PolicySource: Send + Sync + std::fmt::Debug {
    /// Return the configuration in force right now.
    fn load(&self) -> Result<PolicyConfig, PolicyError>;
}

/// In-process configuration that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticPolicySource {
    config: RwLock<PolicyConfig>,
}

impl StaticPolicySource {
    /// Wrap a configuration.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Parse a YAML document into a static source.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        PolicyConfig::from_yaml_str(yaml).map(Self::new)
    }

    /// Replace the configuration. Subsequent loads observe the new rules.
    pub fn replace(&self, config: PolicyConfig) {
        *self.config.write() = config;
        tracing::info!("policy configuration replaced");
    }
}

impl PolicySource for StaticPolicySource {
    fn load(&self) -> Result<PolicyConfig, PolicyError> {
        Ok(self.config.read().clone())
    }
}

/// Reads and validates a YAML policy file on every load.
#[derive(Debug, Clone)]
pub struct FilePolicySource {
    path: PathBuf,
}

impl FilePolicySource {
    /// Source backed by the file at `path`. The file is not read until the
    /// first load.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source backed by the file named in `IDENT_POLICY_PATH`.
    pub fn from_env() -> Result<Self, PolicyError> {
        let path = std::env::var(POLICY_PATH_ENV)
            .map_err(|_| PolicyError::Unavailable(format!("{POLICY_PATH_ENV} is not set")))?;
        Ok(Self::new(path))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicySource for FilePolicySource {
    fn load(&self) -> Result<PolicyConfig, PolicyError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| PolicyError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::trace!(path = %self.path.display(), "policy file read");
        PolicyConfig::from_yaml_str(&content)
    }
}
