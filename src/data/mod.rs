//! Price sources.
//!
//! Two strategies produce a `PriceSeries`:
//!
//! - [`CoinGeckoClient`]: the live market-chart endpoint
//! - [`SyntheticSource`]: a noisy linear ramp, used when live data is unavailable
//!
//! [`FallbackSource`] composes them under a single policy, and
//! [`source_for_config`] picks the composition from `SourceMode`.

use tracing::{info, warn};

use crate::domain::{ForecastConfig, PriceSeries, SourceMode};
use crate::error::AppError;

pub mod coingecko;
pub mod synthetic;

pub use coingecko::CoinGeckoClient;
pub use synthetic::SyntheticSource;

/// Anything that can produce `days` daily prices for an asset.
pub trait PriceSource {
    fn name(&self) -> &'static str;

    fn fetch(&self, asset_id: &str, currency: &str, days: usize) -> Result<PriceSeries, AppError>;
}

/// Try `primary`; if it fails for any reason, log the error and use `fallback`.
pub struct FallbackSource {
    primary: Box<dyn PriceSource>,
    fallback: Box<dyn PriceSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn PriceSource>, fallback: Box<dyn PriceSource>) -> Self {
        Self { primary, fallback }
    }
}

impl PriceSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn fetch(&self, asset_id: &str, currency: &str, days: usize) -> Result<PriceSeries, AppError> {
        match self.primary.fetch(asset_id, currency, days) {
            Ok(series) => Ok(series),
            Err(err) => {
                warn!(
                    source = self.primary.name(),
                    error = %err,
                    "price fetch failed; substituting {} data",
                    self.fallback.name()
                );
                self.fallback.fetch(asset_id, currency, days)
            }
        }
    }
}

/// Build the price source selected by `config.source`.
pub fn source_for_config(config: &ForecastConfig) -> Result<Box<dyn PriceSource>, AppError> {
    let synthetic = SyntheticSource::new(config.seed);
    let source: Box<dyn PriceSource> = match config.source {
        SourceMode::Synthetic => {
            info!("offline mode: using synthetic prices");
            Box::new(synthetic)
        }
        SourceMode::Live => Box::new(CoinGeckoClient::from_env(config.timeout_secs)?),
        SourceMode::Auto => Box::new(FallbackSource::new(
            Box::new(CoinGeckoClient::from_env(config.timeout_secs)?),
            Box::new(synthetic),
        )),
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceOrigin;

    struct FailingSource;

    impl PriceSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn fetch(&self, _: &str, _: &str, _: usize) -> Result<PriceSeries, AppError> {
            Err(AppError::data("connection refused"))
        }
    }

    #[test]
    fn fallback_substitutes_synthetic_series_of_requested_length() {
        let source = FallbackSource::new(Box::new(FailingSource), Box::new(SyntheticSource::new(Some(7))));
        let series = source.fetch("chainlink", "usd", 365).unwrap();

        assert_eq!(series.len(), 365);
        assert_eq!(series.origin, PriceOrigin::Synthetic);
        assert!(series.prices.iter().all(|p| p.is_finite() && *p > 5.0 && *p < 25.0));
    }

    #[test]
    fn fallback_passes_through_primary_success() {
        let source = FallbackSource::new(Box::new(SyntheticSource::new(Some(1))), Box::new(FailingSource));
        assert!(source.fetch("chainlink", "usd", 10).is_ok());
    }

    #[test]
    fn synthetic_mode_never_builds_a_client() {
        let config = ForecastConfig {
            source: SourceMode::Synthetic,
            seed: Some(3),
            ..ForecastConfig::default()
        };
        let source = source_for_config(&config).unwrap();
        assert_eq!(source.name(), "synthetic");
    }
}
