//! # ident-cli — Operator Tooling for the State Engine
//!
//! Provides the `ident` command-line interface for working with policy
//! files outside a running service.
//!
//! ## Subcommands
//!
//! - `ident policy check <file>` — Validate a policy and print its rules.
//! - `ident resolve` — Resolve state and level for an ad-hoc label set.
//! - `ident replay` — Run a scripted sequence of label mutations through the
//!   in-memory store and report every recomputation.
//!
//! ```bash
//! ident policy check policy.yaml
//! ident resolve --policy policy.yaml --label phone=verified --label documents=verified
//! IDENT_POLICY_PATH=policy.yaml ident replay script.yaml --json
//! ```

pub mod policy;
pub mod replay;
pub mod resolve;

use std::path::Path;

use anyhow::{Context, Result};
use ident_policy::{FilePolicySource, PolicyConfig, PolicySource};

/// Policy file source for `path`, falling back to `IDENT_POLICY_PATH`.
pub fn policy_source(path: Option<&Path>) -> Result<FilePolicySource> {
    match path {
        Some(path) => Ok(FilePolicySource::new(path)),
        None => FilePolicySource::from_env().context("no --policy given"),
    }
}

/// Load and validate the policy file at `path` (or from the environment).
pub fn load_policy(path: Option<&Path>) -> Result<PolicyConfig> {
    let source = policy_source(path)?;
    let policy = source
        .load()
        .with_context(|| format!("failed to load policy {}", source.path().display()))?;
    tracing::debug!(path = %source.path().display(), "policy loaded");
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_policy_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "activation_requirements:\n  phone: verified\n").unwrap();

        let policy = load_policy(Some(&path)).unwrap();
        assert_eq!(policy.activation_requirements.len(), 1);
    }

    #[test]
    fn load_policy_without_path_follows_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "level_rules:\n  1: { email: verified }\n").unwrap();

        std::env::set_var(ident_policy::POLICY_PATH_ENV, &path);
        let loaded = load_policy(None);
        std::env::remove_var(ident_policy::POLICY_PATH_ENV);
        assert_eq!(loaded.unwrap().level_rules.len(), 1);

        let err = load_policy(None).unwrap_err();
        assert!(format!("{err:#}").contains("no --policy given"));
    }

    #[test]
    fn load_policy_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_policy(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load policy"));
    }
}
