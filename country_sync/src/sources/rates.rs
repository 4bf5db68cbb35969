//! Exchange rate table fetching and parsing

use super::get_json;
use crate::error::{CountryError, Result, Upstream};
use serde::Deserialize;
use std::collections::HashMap;

/// Full rate response from the exchange rate source
#[derive(Debug, Deserialize)]
struct RateFile {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    time_last_update_utc: Option<String>,
    rates: HashMap<String, f64>,
}

/// Currency code to rate lookup, relative to a fixed base currency
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
    base_code: Option<String>,
}

impl RateTable {
    /// Build a table, keeping only finite positive rates
    pub fn from_rates(rates: HashMap<String, f64>, base_code: Option<String>) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(code, rate)| {
                let usable = rate.is_finite() && *rate > 0.0;
                if !usable {
                    log::debug!("Ignoring unusable rate for {}: {}", code, rate);
                }
                usable
            })
            .collect();
        Self { rates, base_code }
    }

    /// Look up the rate for a currency code
    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Base currency the rates are quoted against
    pub fn base_code(&self) -> Option<&str> {
        self.base_code.as_deref()
    }
}

/// Fetch the complete rate table
pub async fn fetch_rates(client: &reqwest::Client, url: &str) -> Result<RateTable> {
    log::info!("Fetching exchange rates...");
    let file: RateFile = get_json(client, url, Upstream::ExchangeRates).await?;

    if file.result.as_deref() == Some("error") {
        return Err(CountryError::upstream(
            Upstream::ExchangeRates,
            "Source reported an error result",
        ));
    }

    let table = RateTable::from_rates(file.rates, file.base_code);
    log::info!(
        "Fetched {} exchange rates (base: {}, updated: {})",
        table.len(),
        table.base_code().unwrap_or("unknown"),
        file.time_last_update_utc.as_deref().unwrap_or("unknown")
    );
    Ok(table)
}
