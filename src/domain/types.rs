//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - passed between pipeline stages without copying more than needed
//! - exported to JSON (the verification record)
//! - reconstructed in tests from hand-written literals

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Which price source(s) a run may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Fetch live prices; on any failure substitute the synthetic series.
    Auto,
    /// Fetch live prices; a failed fetch aborts the run.
    Live,
    /// Never touch the network; always use the synthetic series.
    Synthetic,
}

/// Where a price series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrigin {
    Live,
    Synthetic,
}

impl PriceOrigin {
    pub fn label(self) -> &'static str {
        match self {
            PriceOrigin::Live => "live",
            PriceOrigin::Synthetic => "synthetic (NOT market data)",
        }
    }
}

/// Pipeline configuration.
///
/// `Default` reproduces the reference run: one year of daily `chainlink/usd` prices,
/// 30-day windows, 100 full-batch Adam epochs at lr 0.01.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub asset_id: String,
    pub currency: String,
    pub days: usize,
    pub seq_len: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub hidden_size: usize,
    pub num_layers: usize,
    /// Log the training loss every `log_every` epochs (starting at epoch 0).
    pub log_every: usize,
    pub model_path: PathBuf,
    pub verification_path: PathBuf,
    pub source: SourceMode,
    pub timeout_secs: u64,
    /// Seed for the synthetic series and weight initialisation. `None` draws from entropy.
    pub seed: Option<u64>,
}

pub const DEFAULT_MODEL_PATH: &str = "scripts/ai/yield_model.bin";
pub const DEFAULT_VERIFICATION_PATH: &str = "scripts/ai/verification_data.json";

/// Upper bound on the price-fetch HTTP timeout.
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 10;

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            asset_id: "chainlink".to_string(),
            currency: "usd".to_string(),
            days: 365,
            seq_len: 30,
            epochs: 100,
            learning_rate: 0.01,
            hidden_size: 50,
            num_layers: 2,
            log_every: 10,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            verification_path: PathBuf::from(DEFAULT_VERIFICATION_PATH),
            source: SourceMode::Auto,
            timeout_secs: 10,
            seed: None,
        }
    }
}

impl ForecastConfig {
    /// Reject configurations that cannot produce a meaningful run.
    ///
    /// Whether the fetched history is long enough for `seq_len` is checked later,
    /// against the series actually returned by the source.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.asset_id.trim().is_empty() {
            return Err(AppError::io("Asset id must not be empty."));
        }
        if self.currency.trim().is_empty() {
            return Err(AppError::io("Quote currency must not be empty."));
        }
        if self.days == 0 {
            return Err(AppError::io("Day count must be > 0."));
        }
        if self.seq_len == 0 {
            return Err(AppError::io("Sequence length must be > 0."));
        }
        if self.hidden_size == 0 || self.num_layers == 0 {
            return Err(AppError::io("Hidden size and layer count must be > 0."));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AppError::io("Learning rate must be a positive finite number."));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(AppError::io(format!(
                "Fetch timeout must be between 1 and {MAX_FETCH_TIMEOUT_SECS} seconds (got {}).",
                self.timeout_secs
            )));
        }
        Ok(())
    }
}

/// Daily prices for one asset, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub origin: PriceOrigin,
    pub timestamps: Vec<DateTime<Utc>>,
    pub prices: Vec<f64>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == PriceOrigin::Synthetic
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }
}

/// Simple fractional changes between consecutive prices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YieldSeries {
    values: Vec<f64>,
}

impl YieldSeries {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One training example: `seq_len` consecutive yields and the yield that follows.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub inputs: Vec<f64>,
    pub target: f64,
}

/// All windows of a yield series, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub seq_len: usize,
    pub windows: Vec<Window>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn inputs(&self) -> Vec<&[f64]> {
        self.windows.iter().map(|w| w.inputs.as_slice()).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.windows.iter().map(|w| w.target).collect()
    }
}

/// The record handed to the proof system: the freshest window and its prediction.
///
/// Field names and types are a fixed contract with the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub input: Vec<f64>,
    /// serde_json writes non-finite floats as `null`; read them back as NaN.
    #[serde(deserialize_with = "nan_from_null")]
    pub prediction: f64,
}

fn nan_from_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Loss trajectory of a training run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingReport {
    /// MSE at every epoch, before that epoch's optimizer step.
    pub losses: Vec<f64>,
    /// `(epoch, loss)` pairs that were logged.
    pub reported: Vec<(usize, f64)>,
    /// First epoch whose loss was NaN or infinite, if any.
    pub diverged_at: Option<usize>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seq_len, 30);
        assert_eq!(config.days, 365);
    }

    #[test]
    fn validate_rejects_zero_seq_len_and_bad_lr() {
        let mut config = ForecastConfig { seq_len: 0, ..ForecastConfig::default() };
        assert!(config.validate().is_err());

        config.seq_len = 30;
        config.learning_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_fetch_timeout() {
        let mut config = ForecastConfig { timeout_secs: 11, ..ForecastConfig::default() };
        assert_eq!(config.validate().unwrap_err().exit_code(), crate::error::EXIT_IO);

        config.timeout_secs = 600;
        assert!(config.validate().is_err());

        config.timeout_secs = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn verification_record_reads_null_prediction_as_nan() {
        let record: VerificationRecord =
            serde_json::from_str(r#"{"input":[0.1,0.2],"prediction":null}"#).unwrap();
        assert_eq!(record.input, vec![0.1, 0.2]);
        assert!(record.prediction.is_nan());
    }
}
