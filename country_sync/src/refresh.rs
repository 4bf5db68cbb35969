//! Full refresh: fetch both sources, reconcile, upsert, redraw the summary
//!
//! Both network calls complete before the database is touched, so an upstream
//! failure leaves every stored row exactly as it was. The upsert runs in a
//! single transaction under one shared timestamp.

use crate::database::{lock, upsert_countries, SharedDb};
use crate::error::Result;
use crate::reconcile::{reconcile_all, MissingCurrencyGdp};
use crate::sources::{fetch_countries, fetch_rates, SourceConfig};
use crate::summary_image::{SummaryCache, SummaryStats};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a successful refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    /// Records written (inserted + updated)
    pub total_processed: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Source entries dropped for lacking a name or population
    pub skipped: usize,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Run one refresh batch
pub async fn refresh_countries(
    db: &SharedDb,
    sources: &SourceConfig,
    summary: &SummaryCache,
) -> Result<RefreshReport> {
    log::info!("Starting data refresh...");

    let client = sources.client()?;
    let entries = fetch_countries(&client, &sources.countries_url).await?;
    let rates = fetch_rates(&client, &sources.rates_url).await?;

    let reconciled = reconcile_all(
        &entries,
        &rates,
        MissingCurrencyGdp::default(),
        &mut rand::thread_rng(),
    );
    if reconciled.skipped > 0 {
        log::warn!(
            "Skipped {} country entries without a name or a usable population",
            reconciled.skipped
        );
    }

    let refreshed_at = Utc::now();
    let upserted = {
        let mut conn = lock(db)?;
        upsert_countries(&mut conn, &reconciled.records, &refreshed_at)?
    };

    // Rows are committed at this point; a broken image must not fail the refresh.
    if let Err(e) = regenerate_summary(db, summary) {
        log::warn!("Failed to regenerate summary image: {}", e);
    }

    log::info!(
        "Successfully refreshed {} countries at {}",
        upserted.total(),
        refreshed_at
    );

    Ok(RefreshReport {
        total_processed: upserted.total(),
        inserted: upserted.inserted,
        updated: upserted.updated,
        skipped: reconciled.skipped,
        last_refreshed_at: refreshed_at,
    })
}

/// Collect current statistics and redraw the cached summary image
pub fn regenerate_summary(db: &SharedDb, summary: &SummaryCache) -> Result<()> {
    let stats = {
        let conn = lock(db)?;
        SummaryStats::collect(&conn)?
    };
    summary.regenerate(&stats)?;
    Ok(())
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
