//! Mapping raw source entries onto storable country records

use crate::gdp;
use crate::sources::{CountryEntry, RateTable};
use rand::Rng;

/// What to store as `estimated_gdp` for countries that list no currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCurrencyGdp {
    /// Store 0 (the service default)
    #[default]
    Zero,
    /// Store no value
    Null,
}

impl MissingCurrencyGdp {
    fn value(self) -> Option<f64> {
        match self {
            MissingCurrencyGdp::Zero => Some(0.0),
            MissingCurrencyGdp::Null => None,
        }
    }
}

/// Normalized country ready for upsert
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

/// Outcome of reconciling a full batch
#[derive(Debug, Default)]
pub struct Reconciled {
    pub records: Vec<CountryRecord>,
    /// Entries dropped for lacking a name or a usable population
    pub skipped: usize,
}

/// Reconcile one entry, or `None` if it lacks a name or a non-negative population
pub fn reconcile_entry<R: Rng + ?Sized>(
    entry: &CountryEntry,
    rates: &RateTable,
    policy: MissingCurrencyGdp,
    rng: &mut R,
) -> Option<CountryRecord> {
    let name = entry.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    let population = entry.population.filter(|p| *p >= 0)?;

    let currency_code = entry.primary_currency_code().map(str::to_string);
    let (exchange_rate, estimated_gdp) = match currency_code.as_deref() {
        None => (None, policy.value()),
        Some(code) => match rates.get(code) {
            Some(rate) => (
                Some(rate),
                gdp::estimate_with(rng, population, Some(rate)),
            ),
            None => (None, None),
        },
    };

    Some(CountryRecord {
        name: name.to_string(),
        capital: entry.capital.clone(),
        region: entry.region.clone(),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: entry.flag.clone(),
    })
}

/// Reconcile every entry of a batch with one policy
pub fn reconcile_all<R: Rng + ?Sized>(
    entries: &[CountryEntry],
    rates: &RateTable,
    policy: MissingCurrencyGdp,
    rng: &mut R,
) -> Reconciled {
    let mut out = Reconciled::default();
    for entry in entries {
        match reconcile_entry(entry, rates, policy, rng) {
            Some(record) => out.records.push(record),
            None => {
                log::debug!(
                    "Skipping country entry {:?} (population {:?})",
                    entry.name,
                    entry.population
                );
                out.skipped += 1;
            }
        }
    }
    out
}
