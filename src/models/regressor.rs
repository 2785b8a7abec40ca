//! Sequence-to-scalar yield regressor: stacked LSTM layers and a linear head.
//!
//! A window of `seq_len` yields is fed one scalar per step. The head projects the
//! last layer's final hidden state to the predicted next yield. No state survives
//! between calls; every prediction starts from zero hidden and cell states.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::distributions::Uniform;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::lstm::{LayerCache, LstmGradients, LstmLayer};

/// Architecture of a [`YieldRegressor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressorConfig {
    pub seq_len: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            seq_len: 30,
            hidden_size: 50,
            num_layers: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub weight: DMatrix<f64>,
    pub bias: DVector<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRegressor {
    config: RegressorConfig,
    layers: Vec<LstmLayer>,
    head: Linear,
}

/// Activations of a training forward pass.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    layers: Vec<LayerCache>,
    last_hidden: DMatrix<f64>,
}

/// Loss gradients for every parameter of a [`YieldRegressor`].
#[derive(Debug, Clone)]
pub struct Gradients {
    layers: Vec<LstmGradients>,
    head_weight: DMatrix<f64>,
    head_bias: DVector<f64>,
}

impl Gradients {
    /// Gradient buffers in the same order as [`YieldRegressor::parameters_mut`].
    pub fn slices(&self) -> Vec<&[f64]> {
        let mut out = Vec::with_capacity(4 * self.layers.len() + 2);
        for layer in &self.layers {
            out.push(layer.w_ih.as_slice());
            out.push(layer.w_hh.as_slice());
            out.push(layer.b_ih.as_slice());
            out.push(layer.b_hh.as_slice());
        }
        out.push(self.head_weight.as_slice());
        out.push(self.head_bias.as_slice());
        out
    }
}

impl YieldRegressor {
    pub fn new<R: Rng>(config: RegressorConfig, rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(config.num_layers);
        layers.push(LstmLayer::new(1, config.hidden_size, rng));
        for _ in 1..config.num_layers {
            layers.push(LstmLayer::new(config.hidden_size, config.hidden_size, rng));
        }

        let k = 1.0 / (config.hidden_size as f64).sqrt();
        let dist = Uniform::new_inclusive(-k, k);
        let head = Linear {
            weight: DMatrix::from_fn(1, config.hidden_size, |_, _| rng.sample(dist)),
            bias: DVector::from_fn(1, |_, _| rng.sample(dist)),
        };

        Self { config, layers, head }
    }

    pub fn config(&self) -> RegressorConfig {
        self.config
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.w_ih.len() + l.w_hh.len() + l.b_ih.len() + l.b_hh.len())
            .sum::<usize>()
            + self.head.weight.len()
            + self.head.bias.len()
    }

    /// Predict the next yield for each window.
    ///
    /// Equivalent to a `(batch, seq_len, 1) -> (batch, 1)` mapping with the
    /// trailing unit dimensions dropped.
    pub fn predict(&self, windows: &[&[f64]]) -> Result<Vec<f64>, AppError> {
        let mut steps = self.to_steps(windows)?;
        for layer in &self.layers {
            steps = layer.forward(&steps);
        }
        match steps.last() {
            Some(last) => Ok(self.project(last)),
            None => Ok(Vec::new()),
        }
    }

    /// Forward pass that keeps the activations needed by [`backward`](Self::backward).
    pub fn forward_train(&self, windows: &[&[f64]]) -> Result<(Vec<f64>, ForwardCache), AppError> {
        let mut steps = self.to_steps(windows)?;
        let mut caches = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (outputs, cache) = layer.forward_cached(&steps);
            caches.push(cache);
            steps = outputs;
        }
        let last_hidden = steps
            .pop()
            .ok_or_else(|| AppError::data("Cannot run the regressor on empty windows."))?;
        let predictions = self.project(&last_hidden);

        Ok((
            predictions,
            ForwardCache {
                layers: caches,
                last_hidden,
            },
        ))
    }

    /// Backpropagate `d_pred` (loss gradient per prediction) through the head and
    /// every LSTM layer.
    pub fn backward(&self, cache: &ForwardCache, d_pred: &[f64]) -> Gradients {
        let batch = d_pred.len();
        let d_out = DMatrix::from_row_slice(1, batch, d_pred);

        let head_weight = &d_out * cache.last_hidden.transpose();
        let head_bias = d_out.column_sum();

        let seq_len = self.config.seq_len;
        let hidden = self.config.hidden_size;
        let mut dh_out = vec![DMatrix::<f64>::zeros(hidden, batch); seq_len];
        dh_out[seq_len - 1] = self.head.weight.tr_mul(&d_out);

        let mut layer_grads = Vec::with_capacity(self.layers.len());
        for (layer, layer_cache) in self.layers.iter().zip(&cache.layers).rev() {
            let (grads, dx) = layer.backward(layer_cache, &dh_out);
            layer_grads.push(grads);
            dh_out = dx;
        }
        layer_grads.reverse();

        Gradients {
            layers: layer_grads,
            head_weight,
            head_bias,
        }
    }

    /// Mutable parameter buffers, in the same order as [`Gradients::slices`].
    pub fn parameters_mut(&mut self) -> Vec<&mut [f64]> {
        let mut out = Vec::with_capacity(4 * self.layers.len() + 2);
        for layer in self.layers.iter_mut() {
            out.push(layer.w_ih.as_mut_slice());
            out.push(layer.w_hh.as_mut_slice());
            out.push(layer.b_ih.as_mut_slice());
            out.push(layer.b_hh.as_mut_slice());
        }
        out.push(self.head.weight.as_mut_slice());
        out.push(self.head.bias.as_mut_slice());
        out
    }

    fn project(&self, hidden: &DMatrix<f64>) -> Vec<f64> {
        let out = &self.head.weight * hidden;
        out.iter().map(|v| v + self.head.bias[0]).collect()
    }

    /// Transpose windows into one `1 × batch` matrix per time step.
    fn to_steps(&self, windows: &[&[f64]]) -> Result<Vec<DMatrix<f64>>, AppError> {
        let seq_len = self.config.seq_len;
        if let Some((idx, w)) = windows.iter().enumerate().find(|(_, w)| w.len() != seq_len) {
            return Err(AppError::data(format!(
                "Window {idx} has {} values; the model expects {seq_len}.",
                w.len()
            )));
        }
        if windows.is_empty() {
            return Ok(Vec::new());
        }
        Ok((0..seq_len)
            .map(|t| DMatrix::from_fn(1, windows.len(), |_, b| windows[b][t]))
            .collect())
    }
}
