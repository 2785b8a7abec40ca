//! Command-line parsing for the yield forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Every flag maps onto a `ForecastConfig` field, and every default
//! matches `ForecastConfig::default()`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_MODEL_PATH, DEFAULT_VERIFICATION_PATH, ForecastConfig, SourceMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "yf", version, about = "Next-period yield forecaster with verifiable output")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch prices, train the model, save the checkpoint and the verification record.
    Train(TrainArgs),
    /// Reload a checkpoint and recompute the prediction stored in a verification record.
    Replay(ReplayArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct TrainArgs {
    /// Asset id on the price provider (e.g. `chainlink`, `bitcoin`).
    #[arg(short = 'a', long, default_value = "chainlink")]
    pub asset: String,

    /// Quote currency.
    #[arg(long, default_value = "usd")]
    pub currency: String,

    /// Days of price history to fetch.
    #[arg(short = 'd', long, default_value_t = 365)]
    pub days: usize,

    /// Window length (yields per model input).
    #[arg(long, default_value_t = 30)]
    pub seq_len: usize,

    /// Training epochs (full-batch Adam steps).
    #[arg(short = 'e', long, default_value_t = 100)]
    pub epochs: usize,

    /// Adam learning rate.
    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    /// LSTM hidden width.
    #[arg(long, default_value_t = 50)]
    pub hidden: usize,

    /// Stacked LSTM layers.
    #[arg(long, default_value_t = 2)]
    pub layers: usize,

    /// Log the training loss every N epochs.
    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    /// Checkpoint output path (overwritten).
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Verification record output path (overwritten).
    #[arg(long, default_value = DEFAULT_VERIFICATION_PATH)]
    pub verification_path: PathBuf,

    /// Price source policy.
    #[arg(long, value_enum, default_value_t = SourceMode::Auto)]
    pub source: SourceMode,

    /// HTTP timeout for the price fetch, in seconds (1-10).
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Seed for synthetic prices and weight initialisation.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Parser, Clone)]
pub struct ReplayArgs {
    /// Checkpoint written by `yf train`.
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub checkpoint: PathBuf,

    /// Verification record written by `yf train`.
    #[arg(long, default_value = DEFAULT_VERIFICATION_PATH)]
    pub verification: PathBuf,
}

pub fn forecast_config_from_args(args: &TrainArgs) -> ForecastConfig {
    ForecastConfig {
        asset_id: args.asset.clone(),
        currency: args.currency.clone(),
        days: args.days,
        seq_len: args.seq_len,
        epochs: args.epochs,
        learning_rate: args.lr,
        hidden_size: args.hidden,
        num_layers: args.layers,
        log_every: args.log_every,
        model_path: args.model_path.clone(),
        verification_path: args.verification_path.clone(),
        source: args.source,
        timeout_secs: args.timeout,
        seed: args.seed,
    }
}
