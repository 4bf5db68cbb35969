//! Database operations for country sync
//!
//! Uses parameterized queries for every value (no user input is concatenated
//! into SQL). Batch writes run inside one transaction so a refresh is either
//! fully visible or not at all.

use crate::error::CountryError;
use crate::reconcile::CountryRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Storage handle shared by the web layer and the refresh pipeline
pub type SharedDb = Arc<Mutex<Connection>>;

/// Lock the shared connection
///
/// The guard must not be held across an `.await`.
pub fn lock(db: &SharedDb) -> crate::error::Result<MutexGuard<'_, Connection>> {
    db.lock().map_err(|_| CountryError::LockPoisoned)
}

/// Case-folded identity key for a country name
///
/// SQLite's `NOCASE` only folds ASCII, so names like "Åland Islands" are
/// folded here with Unicode lowercasing and matched through `name_key`.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Initialize the database schema
///
/// `name_key` holds [`name_key`] of `name`; uniqueness and lookups go through it.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS countries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            capital TEXT,
            region TEXT,
            population INTEGER NOT NULL CHECK (population >= 0),
            currency_code TEXT,
            exchange_rate REAL,
            estimated_gdp REAL,
            flag_url TEXT,
            last_refreshed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_countries_region ON countries(region);
        CREATE INDEX IF NOT EXISTS idx_countries_currency ON countries(currency_code);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Stored country row (also the JSON shape served by the API)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

fn country_from_row(row: &Row<'_>) -> DbResult<Country> {
    Ok(Country {
        id: row.get(0)?,
        name: row.get(1)?,
        capital: row.get(2)?,
        region: row.get(3)?,
        population: row.get(4)?,
        currency_code: row.get(5)?,
        exchange_rate: row.get(6)?,
        estimated_gdp: row.get(7)?,
        flag_url: row.get(8)?,
        last_refreshed_at: row.get(9)?,
    })
}

// ── Upsert Engine ──────────────────────────────────────────────────────────

/// Whether an upsert created or overwrote a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Counts for a batch upsert
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Insert or overwrite a single country, matched case-insensitively by name
///
/// On update the row id and stored name spelling are kept; every other field
/// is replaced.
pub fn upsert_country(
    conn: &Connection,
    record: &CountryRecord,
    refreshed_at: &DateTime<Utc>,
) -> DbResult<UpsertOutcome> {
    let existing: Option<i64> = conn
        .prepare_cached("SELECT id FROM countries WHERE name_key = ?1")?
        .query_row(params![name_key(&record.name)], |row| row.get(0))
        .optional()?;

    match existing {
        Some(id) => {
            conn.prepare_cached(
                "UPDATE countries SET
                    capital = ?2, region = ?3, population = ?4, currency_code = ?5,
                    exchange_rate = ?6, estimated_gdp = ?7, flag_url = ?8,
                    last_refreshed_at = ?9
                 WHERE id = ?1",
            )?
            .execute(params![
                id,
                &record.capital,
                &record.region,
                record.population,
                &record.currency_code,
                record.exchange_rate,
                record.estimated_gdp,
                &record.flag_url,
                refreshed_at,
            ])?;
            Ok(UpsertOutcome::Updated)
        }
        None => {
            conn.prepare_cached(
                "INSERT INTO countries
                    (name, name_key, capital, region, population, currency_code,
                     exchange_rate, estimated_gdp, flag_url, last_refreshed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?
            .execute(params![
                &record.name,
                name_key(&record.name),
                &record.capital,
                &record.region,
                record.population,
                &record.currency_code,
                record.exchange_rate,
                record.estimated_gdp,
                &record.flag_url,
                refreshed_at,
            ])?;
            Ok(UpsertOutcome::Inserted)
        }
    }
}

/// Upsert a whole batch under one timestamp
///
/// All operations are wrapped in a transaction; any failure rolls back the
/// entire batch.
pub fn upsert_countries(
    conn: &mut Connection,
    records: &[CountryRecord],
    refreshed_at: &DateTime<Utc>,
) -> DbResult<UpsertSummary> {
    let tx = conn.transaction()?;
    let mut summary = UpsertSummary::default();

    for record in records {
        match upsert_country(&tx, record, refreshed_at)? {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
        }
    }

    tx.commit()?;
    log::info!(
        "Upserted {} countries ({} new, {} updated)",
        summary.total(),
        summary.inserted,
        summary.updated
    );
    Ok(summary)
}

/// Delete a country by name (case-insensitive)
///
/// Returns `false` without touching the store when nothing matches.
pub fn delete_country(conn: &Connection, name: &str) -> DbResult<bool> {
    let affected = conn.execute(
        "DELETE FROM countries WHERE name_key = ?1",
        params![name_key(name)],
    )?;
    Ok(affected > 0)
}

/// Look up a country by name (case-insensitive)
pub fn get_country_by_name(conn: &Connection, name: &str) -> DbResult<Option<Country>> {
    let sql = format!(
        "SELECT {} FROM countries WHERE name_key = ?1",
        COUNTRY_COLUMNS
    );
    conn.query_row(&sql, params![name_key(name)], country_from_row)
        .optional()
}

// ── Query Engine ───────────────────────────────────────────────────────────

/// Recognized list orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    GdpDesc,
    GdpAsc,
    NameAsc,
    NameDesc,
    PopulationAsc,
    PopulationDesc,
}

impl SortOrder {
    /// ORDER BY clause for this sort
    ///
    /// GDP sorts lead with an is-null key so missing values come last in both
    /// directions. Every clause ends on `id` for a stable order.
    fn order_by(self) -> &'static str {
        match self {
            SortOrder::GdpDesc => "estimated_gdp IS NULL, estimated_gdp DESC, id",
            SortOrder::GdpAsc => "estimated_gdp IS NULL, estimated_gdp ASC, id",
            SortOrder::NameAsc => "name_key ASC, id",
            SortOrder::NameDesc => "name_key DESC, id",
            SortOrder::PopulationAsc => "population ASC, id",
            SortOrder::PopulationDesc => "population DESC, id",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::GdpDesc => "gdp_desc",
            SortOrder::GdpAsc => "gdp_asc",
            SortOrder::NameAsc => "name_asc",
            SortOrder::NameDesc => "name_desc",
            SortOrder::PopulationAsc => "population_asc",
            SortOrder::PopulationDesc => "population_desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CountryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gdp_desc" => Ok(SortOrder::GdpDesc),
            "gdp_asc" => Ok(SortOrder::GdpAsc),
            "name_asc" => Ok(SortOrder::NameAsc),
            "name_desc" => Ok(SortOrder::NameDesc),
            "population_asc" => Ok(SortOrder::PopulationAsc),
            "population_desc" => Ok(SortOrder::PopulationDesc),
            other => Err(CountryError::Validation(format!(
                "Unrecognized sort '{}', expected one of: gdp_asc, gdp_desc, name_asc, \
                 name_desc, population_asc, population_desc",
                other
            ))),
        }
    }
}

/// Filters and ordering for [`list_countries`]
#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    /// Exact, case-sensitive region match
    pub region: Option<String>,
    /// Exact currency code match
    pub currency: Option<String>,
    /// `None` keeps insertion order
    pub sort: Option<SortOrder>,
}

/// List countries matching every given filter
pub fn list_countries(conn: &Connection, filter: &CountryFilter) -> DbResult<Vec<Country>> {
    let region = filter.region.as_deref().filter(|s| !s.is_empty());
    let currency = filter.currency.as_deref().filter(|s| !s.is_empty());
    let order_by = filter.sort.map(SortOrder::order_by).unwrap_or("id");

    let sql = format!(
        "SELECT {} FROM countries
         WHERE (?1 IS NULL OR region = ?1)
           AND (?2 IS NULL OR currency_code = ?2)
         ORDER BY {}",
        COUNTRY_COLUMNS, order_by
    );

    let mut stmt = conn.prepare(&sql)?;
    let results: DbResult<Vec<Country>> = stmt
        .query_map(params![region, currency], country_from_row)?
        .collect();
    results
}

/// Countries with a known GDP, highest first
pub fn top_countries_by_gdp(conn: &Connection, limit: usize) -> DbResult<Vec<Country>> {
    let sql = format!(
        "SELECT {} FROM countries
         WHERE estimated_gdp IS NOT NULL
         ORDER BY estimated_gdp DESC, id
         LIMIT ?1",
        COUNTRY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let results: DbResult<Vec<Country>> = stmt
        .query_map(params![limit as i64], country_from_row)?
        .collect();
    results
}

/// Get total count of stored countries
pub fn count_countries(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))
}

/// Row count plus the most recent refresh timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub total_countries: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Get the store status (`last_refreshed_at` is `None` when empty)
pub fn get_status(conn: &Connection) -> DbResult<StatusSnapshot> {
    conn.query_row(
        "SELECT COUNT(*), MAX(last_refreshed_at) FROM countries",
        [],
        |row| {
            Ok(StatusSnapshot {
                total_countries: row.get(0)?,
                last_refreshed_at: row.get(1)?,
            })
        },
    )
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;
