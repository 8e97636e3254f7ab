//! Exchange rate retrieval
//!
//! Refreshes the currency-conversion table from an open rate feed. Any
//! failure degrades to the compiled-in fallback table; price display never
//! blocks on the network.

use campricer_common::currency::{fallback_rates, RateTable, CURRENCIES};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";
const USER_AGENT: &str = "CamPricer/0.1.0 (https://github.com/campricer/campricer)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Rate feed errors
#[derive(Debug, Error)]
pub enum RateError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Feed returned a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Exchange rate client with static fallback
pub struct RateFetcher {
    http: reqwest::Client,
    url: String,
}

impl RateFetcher {
    pub fn new() -> Result<Self, RateError> {
        Self::with_url(RATES_URL)
    }

    /// Client pointed at a non-default feed URL
    pub fn with_url(url: impl Into<String>) -> Result<Self, RateError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RateError::Network(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Current rate table; falls back to the static table on any failure
    ///
    /// Returns the table plus whether it came from the live feed.
    pub async fn fetch(&self) -> (RateTable, bool) {
        match self.fetch_live().await {
            Ok(rates) => {
                tracing::info!(currencies = rates.len(), "exchange rates refreshed");
                (rates, true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "rate refresh failed, using fallback table");
                (fallback_rates(), false)
            }
        }
    }

    async fn fetch_live(&self) -> Result<RateTable, RateError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RateError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RateError::Api(status.as_u16(), error_text));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| RateError::Network(e.to_string()))?;

        // Keep only supported currencies; any the feed misses fall back to
        // the static value so conversion never loses a code mid-session.
        let fallback = fallback_rates();
        let mut rates = RateTable::new();
        for currency in CURRENCIES {
            let rate = body
                .rates
                .get(currency.code)
                .or_else(|| fallback.get(currency.code))
                .copied()
                .unwrap_or(1.0);
            rates.insert(currency.code.to_string(), rate);
        }
        Ok(rates)
    }
}
