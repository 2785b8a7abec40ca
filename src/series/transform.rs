use crate::domain::{TrainingSet, Window, YieldSeries};
use crate::error::AppError;

/// Simple percentage change between consecutive prices.
///
/// `yields[i] = (prices[i + 1] - prices[i]) / prices[i]`, so the result is one
/// element shorter than the input.
///
/// # Errors
/// Returns a data error if the series is empty or any price is not a positive
/// finite number.
pub fn to_yields(prices: &[f64]) -> Result<YieldSeries, AppError> {
    if prices.is_empty() {
        return Err(AppError::data("Cannot compute yields from an empty price series."));
    }
    if let Some((idx, p)) = prices.iter().enumerate().find(|(_, p)| !(p.is_finite() && **p > 0.0)) {
        return Err(AppError::data(format!(
            "Invalid price {p} at index {idx}: prices must be positive and finite."
        )));
    }

    let values = prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
    Ok(YieldSeries::from_values(values))
}

/// Every contiguous window of `seq_len` yields with step 1, each paired with the
/// yield immediately after it.
///
/// Produces `len - seq_len` windows, or none when `len <= seq_len`.
pub fn windows(series: &YieldSeries, seq_len: usize) -> TrainingSet {
    let values = series.values();
    let count = values.len().saturating_sub(seq_len);

    let windows = (0..count)
        .map(|k| Window {
            inputs: values[k..k + seq_len].to_vec(),
            target: values[k + seq_len],
        })
        .collect();

    TrainingSet { seq_len, windows }
}

/// The most recent `seq_len` yields, or `None` if the series is shorter.
pub fn latest_window(series: &YieldSeries, seq_len: usize) -> Option<&[f64]> {
    let values = series.values();
    values.len().checked_sub(seq_len).map(|start| &values[start..])
}
