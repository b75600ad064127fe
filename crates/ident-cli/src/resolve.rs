//! # Resolve Subcommand
//!
//! Evaluates a policy against a label set supplied on the command line or in
//! a YAML file, without touching any store.
//!
//! Labels given with `--label` use the form `key=value[@scope]`, scope
//! defaulting to `private`. A `--labels` file holds a list of mappings:
//!
//! ```yaml
//! - { key: phone, value: verified }
//! - { key: email, value: verified, scope: public }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use ident_core::{AccountId, Label, LabelScope};
use ident_state::{resolve_level, resolve_state, FactProjection};
use serde::{Deserialize, Serialize};

use crate::load_policy;

/// Arguments for the `ident resolve` subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Policy YAML file. Defaults to `IDENT_POLICY_PATH`.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Label as `key=value[@scope]`. Repeatable.
    #[arg(long = "label", value_name = "KEY=VALUE[@SCOPE]")]
    pub labels: Vec<String>,

    /// YAML file with a list of `{key, value, scope}` labels.
    #[arg(long = "labels")]
    pub labels_file: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One label as written in a `--labels` file.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelSpec {
    /// Raw key, normalized when the label is built.
    pub key: String,
    /// Raw value, normalized when the label is built.
    pub value: String,
    /// Scope; `private` when omitted.
    #[serde(default = "private_scope")]
    pub scope: LabelScope,
}

fn private_scope() -> LabelScope {
    LabelScope::Private
}

/// Resolution result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Resolved lifecycle state.
    pub state: String,
    /// Resolved trust level.
    pub level: u32,
    /// Private facts the resolution ran against.
    pub facts: FactProjection,
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs) -> Result<u8> {
    let policy = load_policy(args.policy.as_deref())?;

    let mut specs = Vec::new();
    if let Some(path) = &args.labels_file {
        specs.extend(read_label_file(path)?);
    }
    for raw in &args.labels {
        specs.push(parse_label_arg(raw)?);
    }

    let labels = build_labels(&specs)?;
    let facts = FactProjection::from_labels(&labels);
    let resolution = Resolution {
        state: resolve_state(&facts, &policy),
        level: resolve_level(&facts, &policy),
        facts,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!("state: {}", resolution.state);
        println!("level: {}", resolution.level);
        if resolution.facts.is_empty() {
            println!("facts: (none)");
        } else {
            println!("facts:");
            for (key, value) in resolution.facts.iter() {
                println!("  {key} = {value}");
            }
        }
    }
    Ok(0)
}

/// Parse `key=value[@scope]`.
///
/// A trailing `@word` is taken as the scope only when `word` names one;
/// otherwise it stays part of the value.
pub fn parse_label_arg(raw: &str) -> Result<LabelSpec> {
    let Some((key, rest)) = raw.split_once('=') else {
        bail!("label {raw:?} is not of the form key=value[@scope]");
    };
    let (value, scope) = match rest.rsplit_once('@') {
        Some((value, scope)) => match scope.parse::<LabelScope>() {
            Ok(scope) => (value, scope),
            Err(_) => (rest, LabelScope::Private),
        },
        None => (rest, LabelScope::Private),
    };
    Ok(LabelSpec {
        key: key.to_string(),
        value: value.to_string(),
        scope,
    })
}

fn read_label_file(path: &Path) -> Result<Vec<LabelSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read labels file {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse labels file {}", path.display()))
}

/// Validate specs into labels on a throwaway account, enforcing
/// `(key, scope)` uniqueness the way the store does.
pub fn build_labels(specs: &[LabelSpec]) -> Result<Vec<Label>> {
    let account = AccountId::new();
    let mut labels: Vec<Label> = Vec::with_capacity(specs.len());
    for spec in specs {
        let label = Label::new(account, &spec.key, &spec.value, spec.scope)
            .with_context(|| format!("invalid label {}={}", spec.key, spec.value))?;
        if labels
            .iter()
            .any(|l| l.key == label.key && l.scope == label.scope)
        {
            bail!(
                "key {} has already been taken in scope {}",
                label.key,
                label.scope
            );
        }
        labels.push(label);
    }
    Ok(labels)
}
