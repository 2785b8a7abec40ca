//! `yield-forecast` library crate.
//!
//! The binary (`yf`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes or touching the network
//! - the checkpoint/verification readers can be reused by downstream tooling

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod models;
pub mod report;
pub mod series;
