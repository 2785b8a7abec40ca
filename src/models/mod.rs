//! Recurrent yield model.
//!
//! - `lstm`: a single LSTM layer with cached forward pass and BPTT
//! - `regressor`: stacked layers + linear head, the model the pipeline trains

pub mod lstm;
pub mod regressor;

pub use regressor::*;
