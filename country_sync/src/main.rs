//! Country Sync - Country Reference Data Service
//!
//! Serves country data from SQLite and refreshes it from the external sources
//! on demand (`POST /countries/refresh`).

use clap::Parser;
use country_sync::sources::{DEFAULT_COUNTRIES_URL, DEFAULT_RATES_URL, DEFAULT_TIMEOUT_SECS};
use country_sync::web::{self, AppState};
use country_sync::{init_schema, refresh_countries, SourceConfig, SummaryCache};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Country data REST service backed by SQLite
#[derive(Parser, Debug)]
#[command(name = "country_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, env = "COUNTRY_SYNC_DATABASE", default_value_t = default_db_path())]
    database: String,

    /// Directory for the rendered summary image (default: `cache` next to the database)
    #[arg(long, env = "COUNTRY_SYNC_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Port for the REST API
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Country source URL
    #[arg(long, env = "COUNTRY_SYNC_COUNTRIES_URL", default_value = DEFAULT_COUNTRIES_URL)]
    countries_url: String,

    /// Exchange rate source URL
    #[arg(long, env = "COUNTRY_SYNC_RATES_URL", default_value = DEFAULT_RATES_URL)]
    rates_url: String,

    /// Per-call timeout for external sources, in seconds
    #[arg(long, env = "COUNTRY_SYNC_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Run one refresh before starting the server
    #[arg(long, default_value_t = false)]
    refresh_on_start: bool,
}

/// Returns the default database path: ~/.local/share/country_sync/countries.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("country_sync")
        .join("countries.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting country_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    let cache_dir = args.cache_dir.clone().unwrap_or_else(|| {
        db_path
            .parent()
            .map(|p| p.join("cache"))
            .unwrap_or_else(|| PathBuf::from("cache"))
    });

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        sources: Arc::new(SourceConfig {
            countries_url: args.countries_url,
            rates_url: args.rates_url,
            timeout: Duration::from_secs(args.timeout_secs),
        }),
        summary: Arc::new(SummaryCache::new(&cache_dir)),
    };

    if args.refresh_on_start {
        match refresh_countries(&state.db, &state.sources, &state.summary).await {
            Ok(report) => log::info!(
                "Initial refresh stored {} countries ({} skipped)",
                report.total_processed,
                report.skipped
            ),
            Err(e) => log::error!("Initial refresh failed: {}", e),
        }
    }

    if let Err(e) = web::serve(state, args.port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
