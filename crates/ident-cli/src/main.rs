//! # ident CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ident_cli::policy::{run_policy, PolicyArgs};
use ident_cli::replay::{run_replay, ReplayArgs};
use ident_cli::resolve::{run_resolve, ResolveArgs};

/// ident state engine CLI
///
/// Validates label policies and shows how they map private labels to an
/// account's lifecycle state and trust level.
#[derive(Parser, Debug)]
#[command(name = "ident", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Policy file operations.
    Policy(PolicyArgs),

    /// Resolve state and level for a set of labels.
    Resolve(ResolveArgs),

    /// Replay a script of label mutations through the in-memory store.
    Replay(ReplayArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "ident CLI starting");

    let result = match cli.command {
        Commands::Policy(args) => run_policy(&args),
        Commands::Resolve(args) => run_resolve(&args),
        Commands::Replay(args) => run_replay(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
