//! Country Sync - Country Reference Data Service
//!
//! Mirrors country data and currency exchange rates from two external sources
//! into SQLite, derives an estimated GDP per country, and serves the data over
//! a small REST API together with a rendered summary image.

pub mod database;
pub mod error;
pub mod gdp;
pub mod reconcile;
pub mod refresh;
pub mod sources;
pub mod summary_image;
pub mod web;

pub use database::{init_schema, Country, CountryFilter, SharedDb, SortOrder};
pub use error::{CountryError, Result, Upstream};
pub use refresh::{refresh_countries, RefreshReport};
pub use sources::SourceConfig;
pub use summary_image::SummaryCache;
