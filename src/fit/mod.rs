//! Model training.
//!
//! Responsibilities:
//!
//! - Adam updates over the model's flat parameter buffers (`adam`)
//! - the full-batch MSE training loop with periodic loss logging (`trainer`)

pub mod adam;
pub mod trainer;

pub use adam::*;
pub use trainer::*;
