//! Terminal output for finished runs.
//!
//! Formatting lives here so the pipeline only returns data.

use crate::app::pipeline::{ReplayOutcome, RunOutput};
use crate::domain::ForecastConfig;

/// Format the end-of-run summary printed by `yf train`.
pub fn format_run_summary(run: &RunOutput, config: &ForecastConfig) -> String {
    let mut out = String::new();

    out.push_str("=== yf - next-period yield forecast ===\n");
    out.push_str(&format!("Asset: {}/{}\n", config.asset_id, config.currency));
    out.push_str(&format!("Prices: n={} | source={}", run.n_prices, run.origin.label()));
    if let Some(ts) = run.last_price_at {
        out.push_str(&format!(" | last={}", ts.format("%Y-%m-%d")));
    }
    out.push('\n');
    out.push_str(&format!(
        "Yields: n={} | windows={} x {}\n",
        run.n_yields, run.n_windows, config.seq_len
    ));
    out.push_str(&format!(
        "Model: LSTM {}x{} -> 1 | epochs={} | lr={}\n",
        config.num_layers, config.hidden_size, config.epochs, config.learning_rate
    ));

    out.push_str("\nTraining loss:\n");
    for (epoch, loss) in &run.training.reported {
        out.push_str(&format!("  epoch {epoch:>4}  {loss:.8}\n"));
    }
    if let Some(loss) = run.training.final_loss() {
        out.push_str(&format!("  final       {loss:.8}\n"));
    }
    if let Some(epoch) = run.training.diverged_at {
        out.push_str(&format!("  WARNING: loss became non-finite at epoch {epoch}\n"));
    }

    out.push_str(&format!("\nPredicted next yield: {:.6}\n", run.prediction));
    out.push_str(&format!("Model saved to {}\n", run.model_path.display()));
    out.push_str(&format!("Verification data saved to {}\n", run.verification_path.display()));
    out
}

/// Format the result of `yf replay`.
pub fn format_replay(outcome: &ReplayOutcome) -> String {
    format!(
        "Recorded prediction: {:.12}\nReplayed prediction: {:.12}\nMatch: {}\n",
        outcome.recorded,
        outcome.replayed,
        if outcome.matches() { "yes" } else { "NO" }
    )
}
