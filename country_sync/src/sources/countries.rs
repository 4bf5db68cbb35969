//! Country reference data fetching and parsing

use super::get_json;
use crate::error::{Result, Upstream};
use serde::Deserialize;

/// One currency listed for a country
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CurrencyDescriptor {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Raw country entry as delivered by the country source
///
/// Every field is optional; the reconciler decides what is usable.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CountryEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    /// Flag image URL
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub currencies: Option<Vec<CurrencyDescriptor>>,
}

impl CountryEntry {
    /// Code of the first listed currency, if the source provides one
    pub fn primary_currency_code(&self) -> Option<&str> {
        self.currencies
            .as_ref()
            .and_then(|list| list.first())
            .and_then(|c| c.code.as_deref())
    }
}

/// Fetch the complete country list
pub async fn fetch_countries(client: &reqwest::Client, url: &str) -> Result<Vec<CountryEntry>> {
    log::info!("Fetching country list...");
    let entries: Vec<CountryEntry> = get_json(client, url, Upstream::Countries).await?;
    log::info!("Fetched {} country entries", entries.len());
    Ok(entries)
}
