//! Full-batch training loop.
//!
//! Every epoch runs the whole training set through the model, computes the MSE
//! against the targets, backpropagates, and applies one Adam step. There is no
//! early stopping and no validation split; the loss is only monitored.

use tracing::{debug, info, warn};

use crate::domain::{TrainingReport, TrainingSet};
use crate::error::{AppError, EXIT_INSUFFICIENT_HISTORY};
use crate::fit::adam::Adam;
use crate::models::YieldRegressor;

/// Training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Log every `log_every` epochs, starting at epoch 0. Zero disables periodic logs.
    pub log_every: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.01,
            log_every: 10,
        }
    }
}

/// Mean squared error.
pub fn mse(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = targets.len() as f64;
    predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).powi(2))
        .sum::<f64>()
        / n
}

/// Fit `model` in place on every window of `set`.
///
/// A non-finite loss is reported once and otherwise left alone: training runs
/// for the full epoch count either way.
pub fn fit(model: &mut YieldRegressor, set: &TrainingSet, options: &TrainOptions) -> Result<TrainingReport, AppError> {
    if set.is_empty() {
        return Err(AppError::new(
            EXIT_INSUFFICIENT_HISTORY,
            format!("No windows of length {} to train on.", set.seq_len),
        ));
    }

    let inputs = set.inputs();
    let targets = set.targets();
    let n = targets.len() as f64;
    let mut optimizer = Adam::new(options.learning_rate);
    let mut report = TrainingReport::default();

    info!(
        windows = set.len(),
        parameters = model.parameter_count(),
        epochs = options.epochs,
        learning_rate = options.learning_rate,
        "training model"
    );

    for epoch in 0..options.epochs {
        let (predictions, cache) = model.forward_train(&inputs)?;
        let loss = mse(&predictions, &targets);
        report.losses.push(loss);

        if !loss.is_finite() && report.diverged_at.is_none() {
            warn!(epoch, loss, "training loss is not finite; the saved model will be unusable");
            report.diverged_at = Some(epoch);
        }

        let d_pred: Vec<f64> = predictions
            .iter()
            .zip(&targets)
            .map(|(p, y)| 2.0 * (p - y) / n)
            .collect();
        // Fresh gradients every epoch; nothing accumulates across steps.
        let grads = model.backward(&cache, &d_pred);
        optimizer.step(&mut model.parameters_mut(), &grads.slices());

        if options.log_every > 0 && epoch % options.log_every == 0 {
            info!(epoch, loss, "epoch");
            report.reported.push((epoch, loss));
        } else {
            debug!(epoch, loss, "epoch");
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Window, YieldSeries};
    use crate::models::RegressorConfig;
    use crate::series::windows;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sine_set(seq_len: usize) -> TrainingSet {
        let series = YieldSeries::from_values((0..60).map(|i| (i as f64 * 0.4).sin()).collect());
        windows(&series, seq_len)
    }

    fn small_model(seq_len: usize) -> YieldRegressor {
        let config = RegressorConfig {
            seq_len,
            hidden_size: 8,
            num_layers: 2,
        };
        YieldRegressor::new(config, &mut StdRng::seed_from_u64(21))
    }

    #[test]
    fn mse_of_known_values() {
        assert!((mse(&[1.0, 2.0], &[0.0, 4.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn loss_decreases_on_a_learnable_series() {
        let set = sine_set(6);
        let mut model = small_model(6);
        let options = TrainOptions {
            epochs: 150,
            learning_rate: 0.01,
            log_every: 10,
        };

        let report = fit(&mut model, &set, &options).unwrap();

        assert_eq!(report.losses.len(), 150);
        let first = report.losses[0];
        let last = report.final_loss().unwrap();
        assert!(last < 0.5 * first, "loss went from {first} to {last}");
        assert!(report.diverged_at.is_none());
    }

    #[test]
    fn reports_every_tenth_epoch() {
        let set = sine_set(4);
        let mut model = small_model(4);
        let options = TrainOptions {
            epochs: 25,
            learning_rate: 0.01,
            log_every: 10,
        };

        let report = fit(&mut model, &set, &options).unwrap();
        let epochs: Vec<usize> = report.reported.iter().map(|(e, _)| *e).collect();
        assert_eq!(epochs, vec![0, 10, 20]);
    }

    #[test]
    fn refuses_empty_training_set() {
        let mut model = small_model(4);
        let empty = TrainingSet {
            seq_len: 4,
            windows: Vec::<Window>::new(),
        };
        let err = fit(&mut model, &empty, &TrainOptions::default()).unwrap_err();
        assert!(err.is_insufficient_history());
    }

    #[test]
    fn non_finite_targets_are_flagged_not_fixed() {
        let mut model = small_model(3);
        let set = TrainingSet {
            seq_len: 3,
            windows: vec![Window {
                inputs: vec![0.1, 0.2, 0.3],
                target: f64::INFINITY,
            }],
        };
        let options = TrainOptions {
            epochs: 3,
            learning_rate: 0.01,
            log_every: 0,
        };

        let report = fit(&mut model, &set, &options).unwrap();
        assert_eq!(report.diverged_at, Some(0));
        assert_eq!(report.losses.len(), 3);
    }
}
