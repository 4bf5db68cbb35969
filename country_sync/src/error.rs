//! Error types for country_sync

use std::fmt;
use thiserror::Error;

/// External data source that a refresh depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Country reference data (names, capitals, populations, currencies)
    Countries,
    /// Currency exchange rates
    ExchangeRates,
}

impl Upstream {
    /// Human-readable name used in error details
    pub fn label(&self) -> &'static str {
        match self {
            Upstream::Countries => "Countries API",
            Upstream::ExchangeRates => "Exchange rates API",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unified error type for country_sync operations
#[derive(Debug, Error)]
pub enum CountryError {
    /// An external source could not be fetched or decoded
    #[error("Could not fetch data from {upstream}: {reason}")]
    Upstream { upstream: Upstream, reason: String },
    /// No country matched the requested name
    #[error("Country not found: {0}")]
    NotFound(String),
    /// No refresh has produced a summary image yet
    #[error("Summary image not found")]
    SummaryImageMissing,
    /// Request parameters were rejected before any query ran
    #[error("Validation error: {0}")]
    Validation(String),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// File I/O error (image cache)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Summary image could not be encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// The outbound HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    /// A previous holder of the database lock panicked
    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl CountryError {
    /// Build an upstream error from any displayable cause
    pub fn upstream(upstream: Upstream, reason: impl fmt::Display) -> Self {
        CountryError::Upstream {
            upstream,
            reason: reason.to_string(),
        }
    }
}

/// Result alias for country_sync operations
pub type Result<T> = std::result::Result<T, CountryError>;
