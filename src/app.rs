//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs the tracing subscriber
//! - parses CLI arguments
//! - runs the pipeline (or a replay)
//! - prints the summary

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ReplayArgs, TrainArgs};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `yf` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // `yf` and `yf --days 90` behave like `yf train ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Replay(args) => handle_replay(args),
    }
}

/// Log to stderr at `info` unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = crate::cli::forecast_config_from_args(&args);
    let run = pipeline::run_forecast(&config)?;
    println!("{}", crate::report::format_run_summary(&run, &config));
    Ok(())
}

fn handle_replay(args: ReplayArgs) -> Result<(), AppError> {
    let outcome = pipeline::replay(&args.checkpoint, &args.verification)?;
    println!("{}", crate::report::format_replay(&outcome));
    if outcome.matches() {
        Ok(())
    } else {
        Err(AppError::data("Checkpoint does not reproduce the recorded prediction."))
    }
}

/// Rewrite argv so `yf` defaults to `yf train`.
///
/// Rules:
/// - `yf`                      -> `yf train`
/// - `yf --days 90 ...`        -> `yf train --days 90 ...`
/// - `yf --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("train".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "train" | "replay");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "train".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_trains() {
        assert_eq!(rewrite_args(args(&["yf"])), args(&["yf", "train"]));
    }

    #[test]
    fn leading_flags_go_to_train() {
        assert_eq!(
            rewrite_args(args(&["yf", "--days", "90"])),
            args(&["yf", "train", "--days", "90"])
        );
    }

    #[test]
    fn help_and_subcommands_are_untouched() {
        assert_eq!(rewrite_args(args(&["yf", "--help"])), args(&["yf", "--help"]));
        assert_eq!(rewrite_args(args(&["yf", "replay"])), args(&["yf", "replay"]));
    }
}
