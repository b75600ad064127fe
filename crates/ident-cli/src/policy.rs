//! # Policy Subcommand
//!
//! `ident policy check <file>` loads a policy file with the same validation
//! the engine applies at recomputation time and prints the resulting rules in
//! evaluation order.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use ident_policy::{PolicyConfig, ACTIVE_STATE};

use crate::load_policy;

/// Arguments for the `ident policy` subcommand.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Validate a policy file and print its rules.
    Check {
        /// Path to the policy YAML file.
        file: PathBuf,

        /// Print the parsed policy as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the policy subcommand.
pub fn run_policy(args: &PolicyArgs) -> Result<u8> {
    match &args.command {
        PolicyCommand::Check { file, json } => cmd_check(file, *json),
    }
}

fn cmd_check(file: &Path, json: bool) -> Result<u8> {
    let policy = match load_policy(Some(file)) {
        Ok(policy) => policy,
        Err(e) => {
            println!("INVALID  {}", file.display());
            println!("  {e:#}");
            return Ok(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&policy)?);
    } else {
        println!("OK  {}", file.display());
        print!("{}", summary(&policy));
    }
    Ok(0)
}

/// Human-readable rule listing in evaluation order.
pub fn summary(policy: &PolicyConfig) -> String {
    let mut out = String::new();

    out.push_str("state rules (first match wins):\n");
    if policy.activation_requirements.is_empty() {
        out.push_str(&format!("  {ACTIVE_STATE:<10} (disabled: no requirements)\n"));
    } else {
        let reqs: Vec<String> = policy
            .activation_requirements
            .iter()
            .map(|r| format!("{}={}", r.key, r.value))
            .collect();
        out.push_str(&format!("  {ACTIVE_STATE:<10} all of {}\n", reqs.join(", ")));
    }
    for trigger in &policy.state_triggers {
        let keys: Vec<&str> = trigger.keys.iter().map(|k| k.as_str()).collect();
        out.push_str(&format!("  {:<10} any of {}\n", trigger.state, keys.join(", ")));
    }
    out.push_str(&format!("  {:<10} otherwise\n", ident_core::DEFAULT_STATE));

    out.push_str("level ladder:\n");
    if policy.level_rules.is_empty() {
        out.push_str("  (none, every account stays at level 0)\n");
    }
    for rung in &policy.level_rules {
        let reqs: Vec<String> = rung
            .requirements
            .iter()
            .map(|r| format!("{}={}", r.key, r.value))
            .collect();
        out.push_str(&format!("  {:<3} + {}\n", rung.level, reqs.join(", ")));
    }
    out
}
