//! CoinGecko market-chart integration.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::data::PriceSource;
use crate::domain::{PriceOrigin, PriceSeries};
use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::io(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Build a client from `.env` / the environment.
    ///
    /// Both `COINGECKO_BASE_URL` and `COINGECKO_API_KEY` are optional; the public
    /// endpoint works without a key, subject to rate limits.
    pub fn from_env(timeout_secs: u64) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("COINGECKO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut client = Self::new(base_url, timeout_secs)?;
        client.api_key = std::env::var("COINGECKO_API_KEY").ok().filter(|k| !k.trim().is_empty());
        Ok(client)
    }

    pub fn market_chart_url(&self, asset_id: &str) -> String {
        format!("{}/coins/{asset_id}/market_chart", self.base_url)
    }
}

impl PriceSource for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    fn fetch(&self, asset_id: &str, currency: &str, days: usize) -> Result<PriceSeries, AppError> {
        info!(asset_id, currency, days, "fetching live prices");

        let mut req = self
            .client
            .get(self.market_chart_url(asset_id))
            .query(&[("vs_currency", currency), ("days", &days.to_string())]);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req
            .send()
            .map_err(|e| AppError::data(format!("CoinGecko request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::data(format!(
                "CoinGecko request failed with status {}.",
                resp.status()
            )));
        }

        let body: MarketChartResponse = resp
            .json()
            .map_err(|e| AppError::data(format!("Failed to parse CoinGecko response: {e}")))?;

        parse_prices(body)
    }
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs, oldest first.
    prices: Vec<(f64, f64)>,
}

fn parse_prices(body: MarketChartResponse) -> Result<PriceSeries, AppError> {
    if body.prices.is_empty() {
        return Err(AppError::data("CoinGecko returned no prices."));
    }

    let mut timestamps = Vec::with_capacity(body.prices.len());
    let mut prices = Vec::with_capacity(body.prices.len());
    for (ts_ms, price) in body.prices {
        let ts = DateTime::<Utc>::from_timestamp_millis(ts_ms as i64)
            .ok_or_else(|| AppError::data(format!("Invalid CoinGecko timestamp {ts_ms}.")))?;
        timestamps.push(ts);
        prices.push(price);
    }

    Ok(PriceSeries {
        origin: PriceOrigin::Live,
        timestamps,
        prices,
    })
}
