//! Price → yield transformation and windowing.
//!
//! Both operations are pure. `to_yields` is the boundary where price data is
//! validated: the yield formula divides by the previous price, so zero, negative
//! and non-finite prices are rejected there instead of surfacing later as
//! infinities in the training set.

pub mod transform;

pub use transform::*;
