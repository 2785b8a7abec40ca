//! The forecast pipeline shared by the `train` and `replay` commands.
//!
//! fetch -> yields -> windows -> fit -> save checkpoint -> predict latest window
//! -> save verification record
//!
//! Front-ends only handle argument parsing and printing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::data::{PriceSource, source_for_config};
use crate::domain::{ForecastConfig, PriceOrigin, TrainingReport};
use crate::error::AppError;
use crate::fit::{TrainOptions, fit};
use crate::io::{load_model, read_verification, save_model, save_verification};
use crate::models::{RegressorConfig, YieldRegressor};
use crate::series::{latest_window, to_yields, windows};

/// All outputs of a single training run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub origin: PriceOrigin,
    pub n_prices: usize,
    pub n_yields: usize,
    pub n_windows: usize,
    pub last_price_at: Option<DateTime<Utc>>,
    pub training: TrainingReport,
    pub latest_window: Vec<f64>,
    pub prediction: f64,
    pub model_path: PathBuf,
    pub verification_path: PathBuf,
}

/// Result of re-running a saved model on a saved verification record.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub recorded: f64,
    pub replayed: f64,
}

impl ReplayOutcome {
    /// True when the checkpoint reproduces the recorded prediction (NaN matches NaN,
    /// since the record stores non-finite predictions as `null`).
    pub fn matches(&self) -> bool {
        if self.recorded.is_nan() || self.replayed.is_nan() {
            return self.recorded.is_nan() && !self.replayed.is_finite();
        }
        (self.recorded - self.replayed).abs() <= 1e-12 * self.recorded.abs().max(1.0)
    }
}

/// Run the full pipeline with the price source selected by `config.source`.
pub fn run_forecast(config: &ForecastConfig) -> Result<RunOutput, AppError> {
    let source = source_for_config(config)?;
    run_forecast_with_source(config, source.as_ref())
}

/// Run the full pipeline against an explicit price source.
pub fn run_forecast_with_source(config: &ForecastConfig, source: &dyn PriceSource) -> Result<RunOutput, AppError> {
    config.validate()?;

    // 1) Prices.
    let prices = source.fetch(&config.asset_id, &config.currency, config.days)?;
    if prices.is_synthetic() {
        warn!(points = prices.len(), "training on synthetic prices, not market data");
    } else {
        info!(points = prices.len(), "fetched live prices");
    }

    // 2) Yields and windows. An empty training set stops the run before a model exists.
    let yields = to_yields(&prices.prices)?;
    let set = windows(&yields, config.seq_len);
    if set.is_empty() {
        return Err(AppError::insufficient_history(yields.len(), config.seq_len));
    }

    // 3) Fit.
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let regressor_config = RegressorConfig {
        seq_len: config.seq_len,
        hidden_size: config.hidden_size,
        num_layers: config.num_layers,
    };
    let mut model = YieldRegressor::new(regressor_config, &mut rng);
    let options = TrainOptions {
        epochs: config.epochs,
        learning_rate: config.learning_rate,
        log_every: config.log_every,
    };
    let training = fit(&mut model, &set, &options)?;

    // 4) Checkpoint.
    save_model(&model, &config.asset_id, &config.model_path)?;

    // 5) Predict from the freshest window and export it for verification.
    let latest = latest_window(&yields, config.seq_len)
        .ok_or_else(|| AppError::insufficient_history(yields.len(), config.seq_len))?;
    let prediction = model
        .predict(&[latest])?
        .first()
        .copied()
        .ok_or_else(|| AppError::data("Model returned no prediction for the latest window."))?;
    info!("predicted next yield: {prediction:.6}");

    save_verification(latest, prediction, &config.verification_path)?;

    Ok(RunOutput {
        origin: prices.origin,
        n_prices: prices.len(),
        n_yields: yields.len(),
        n_windows: set.len(),
        last_price_at: prices.last_timestamp(),
        training,
        latest_window: latest.to_vec(),
        prediction,
        model_path: config.model_path.clone(),
        verification_path: config.verification_path.clone(),
    })
}

/// Reload a checkpoint and recompute the prediction for a saved verification record.
pub fn replay(checkpoint: &Path, verification: &Path) -> Result<ReplayOutcome, AppError> {
    let model = load_model(checkpoint)?;
    let record = read_verification(verification)?;

    let expected = model.config().seq_len;
    if record.input.len() != expected {
        return Err(AppError::data(format!(
            "Verification input has {} values; the checkpoint expects {expected}.",
            record.input.len()
        )));
    }

    let replayed = model
        .predict(&[record.input.as_slice()])?
        .first()
        .copied()
        .ok_or_else(|| AppError::data("Model returned no prediction for the recorded input."))?;

    Ok(ReplayOutcome {
        recorded: record.prediction,
        replayed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FallbackSource, SyntheticSource};
    use crate::domain::{PriceSeries, SourceMode};
    use crate::error::{EXIT_DATA, EXIT_INSUFFICIENT_HISTORY};
    use tempfile::{TempDir, tempdir};

    struct FailingSource;

    impl PriceSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn fetch(&self, _: &str, _: &str, _: usize) -> Result<PriceSeries, AppError> {
            Err(AppError::data("simulated outage"))
        }
    }

    struct FixedSource(Vec<f64>);

    impl PriceSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn fetch(&self, _: &str, _: &str, _: usize) -> Result<PriceSeries, AppError> {
            Ok(PriceSeries {
                origin: PriceOrigin::Live,
                timestamps: Vec::new(),
                prices: self.0.clone(),
            })
        }
    }

    fn offline_source(seed: u64) -> FallbackSource {
        FallbackSource::new(Box::new(FailingSource), Box::new(SyntheticSource::new(Some(seed))))
    }

    fn small_config(dir: &TempDir) -> ForecastConfig {
        ForecastConfig {
            days: 100,
            epochs: 20,
            hidden_size: 8,
            model_path: dir.path().join("scripts/ai/yield_model.bin"),
            verification_path: dir.path().join("scripts/ai/verification_data.json"),
            source: SourceMode::Auto,
            seed: Some(17),
            ..ForecastConfig::default()
        }
    }

    #[test]
    fn fallback_run_writes_checkpoint_and_verification() {
        let dir = tempdir().unwrap();
        let config = small_config(&dir);

        let run = run_forecast_with_source(&config, &offline_source(17)).unwrap();

        assert_eq!(run.origin, PriceOrigin::Synthetic);
        assert_eq!(run.n_prices, 100);
        assert_eq!(run.n_yields, 99);
        assert_eq!(run.n_windows, 69);
        assert_eq!(run.training.losses.len(), 20);
        assert_eq!(run.training.reported.iter().map(|(e, _)| *e).collect::<Vec<_>>(), vec![0, 10]);
        assert!(run.prediction.is_finite());
        assert!(config.model_path.exists());

        let record = read_verification(&config.verification_path).unwrap();
        assert_eq!(record.input.len(), 30);
        assert_eq!(record.input, run.latest_window);
        assert_eq!(record.prediction, run.prediction);
    }

    #[test]
    fn replay_reproduces_the_recorded_prediction() {
        let dir = tempdir().unwrap();
        let config = ForecastConfig {
            seq_len: 10,
            days: 60,
            epochs: 5,
            ..small_config(&dir)
        };
        run_forecast_with_source(&config, &offline_source(4)).unwrap();

        let outcome = replay(&config.model_path, &config.verification_path).unwrap();
        assert!(outcome.matches(), "{outcome:?}");
    }

    #[test]
    fn short_history_fails_before_fitting() {
        let dir = tempdir().unwrap();
        let config = ForecastConfig {
            days: 20,
            seq_len: 30,
            ..small_config(&dir)
        };

        let err = run_forecast_with_source(&config, &offline_source(1)).unwrap_err();

        assert_eq!(err.exit_code(), EXIT_INSUFFICIENT_HISTORY);
        assert!(err.message().contains("Insufficient history"));
        assert!(!config.model_path.exists());
        assert!(!config.verification_path.exists());
    }

    #[test]
    fn history_of_exactly_seq_len_plus_one_prices_is_still_too_short() {
        let dir = tempdir().unwrap();
        let config = ForecastConfig {
            days: 31,
            ..small_config(&dir)
        };
        let err = run_forecast_with_source(&config, &offline_source(2)).unwrap_err();
        assert!(err.is_insufficient_history());
    }

    #[test]
    fn zero_price_aborts_the_run() {
        let dir = tempdir().unwrap();
        let config = ForecastConfig {
            seq_len: 3,
            ..small_config(&dir)
        };
        let source = FixedSource(vec![1.0, 1.1, 0.0, 1.2, 1.3, 1.4, 1.5, 1.6]);

        let err = run_forecast_with_source(&config, &source).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
        assert!(!config.model_path.exists());
    }

    #[test]
    fn fetch_error_without_fallback_stops_the_run() {
        let dir = tempdir().unwrap();
        let config = small_config(&dir);
        let err = run_forecast_with_source(&config, &FailingSource).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
        assert!(!config.model_path.exists());
        assert!(!config.verification_path.exists());
    }

    #[test]
    #[ignore = "full-size run: 365 days, hidden 50, 100 epochs; slow without --release"]
    fn reference_configuration_end_to_end() {
        let dir = tempdir().unwrap();
        let config = ForecastConfig {
            model_path: dir.path().join("yield_model.bin"),
            verification_path: dir.path().join("verification_data.json"),
            ..ForecastConfig::default()
        };

        let run = run_forecast_with_source(&config, &offline_source(99)).unwrap();

        assert_eq!(run.n_windows, 364 - 30);
        assert_eq!(run.training.reported.len(), 10);
        let record = read_verification(&config.verification_path).unwrap();
        assert_eq!(record.input.len(), 30);
        assert!(record.prediction.is_finite());
    }
}
