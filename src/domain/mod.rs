//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`ForecastConfig`, `SourceMode`)
//! - price and yield series (`PriceSeries`, `YieldSeries`)
//! - training examples (`Window`, `TrainingSet`)
//! - outputs (`TrainingReport`, `VerificationRecord`)

pub mod types;

pub use types::*;
