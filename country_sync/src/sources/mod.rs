//! External data sources for the refresh pipeline
//!
//! Two independent endpoints are fetched once per refresh: the country list and
//! the exchange rate table. Either may fail on its own; failures are reported as
//! [`CountryError::Upstream`] naming the source.

mod countries;
mod rates;

pub use countries::{fetch_countries, CountryEntry, CurrencyDescriptor};
pub use rates::{fetch_rates, RateTable};

use crate::error::{CountryError, Result, Upstream};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default country source (REST Countries v2, trimmed to the fields we store)
pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";

/// Default exchange rate source (USD base)
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Default per-call network timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "country_sync/1.0";

/// Where and how to reach the external sources
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub countries_url: String,
    pub rates_url: String,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            countries_url: DEFAULT_COUNTRIES_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SourceConfig {
    /// Build the HTTP client shared by both fetchers for one refresh
    pub fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CountryError::HttpClient(e.to_string()))
    }
}

/// GET a JSON document, mapping every failure mode to an upstream error
async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    upstream: Upstream,
) -> Result<T> {
    log::debug!("Fetching {} from {}", upstream, url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CountryError::upstream(upstream, e))?;

    if !response.status().is_success() {
        return Err(CountryError::upstream(
            upstream,
            format!("HTTP error: {}", response.status()),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CountryError::upstream(upstream, e))?;

    serde_json::from_slice(&body)
        .map_err(|e| CountryError::upstream(upstream, format!("Malformed payload: {}", e)))
}

#[cfg(test)]
#[path = "sources_tests.rs"]
mod tests;
