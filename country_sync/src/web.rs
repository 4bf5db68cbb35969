//! REST API for country data
//!
//! Routes:
//! - `POST /countries/refresh` runs the refresh pipeline
//! - `GET /countries?region=&currency=&sort=` lists countries
//! - `GET /countries/image` serves the summary image from the last refresh
//! - `GET /countries/{name}` / `DELETE /countries/{name}` by case-insensitive name
//! - `GET /status` reports row count and last refresh time

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::database::{
    delete_country, get_country_by_name, get_status, list_countries, lock, Country, CountryFilter,
    SharedDb, SortOrder, StatusSnapshot,
};
use crate::error::{CountryError, Result};
use crate::refresh::{refresh_countries, regenerate_summary, RefreshReport};
use crate::sources::SourceConfig;
use crate::summary_image::SummaryCache;

/// Shared application state (database handle, source config, image cache)
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub sources: Arc<SourceConfig>,
    pub summary: Arc<SummaryCache>,
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    region: Option<String>,
    currency: Option<String>,
    sort: Option<String>,
}

impl ListParams {
    /// Validate parameters into a query filter
    fn into_filter(self) -> Result<CountryFilter> {
        let sort = match self.sort.as_deref() {
            None | Some("") => None,
            Some(token) => Some(token.parse::<SortOrder>()?),
        };
        Ok(CountryFilter {
            region: self.region,
            currency: self.currency,
            sort,
        })
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Refresh response body
#[derive(Serialize)]
struct RefreshResponse {
    message: &'static str,
    #[serde(flatten)]
    report: RefreshReport,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

impl IntoResponse for CountryError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            CountryError::Upstream { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "External data source unavailable",
                Some(self.to_string()),
            ),
            CountryError::NotFound(_) => (StatusCode::NOT_FOUND, "Country not found", None),
            CountryError::SummaryImageMissing => {
                (StatusCode::NOT_FOUND, "Summary image not found", None)
            }
            CountryError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "Validation failed", Some(msg.clone()))
            }
            CountryError::Database(_)
            | CountryError::Io(_)
            | CountryError::Image(_)
            | CountryError::HttpClient(_)
            | CountryError::LockPoisoned => {
                log::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorBody {
            error: error.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// GET /
async fn index_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Countries API is running",
    })
}

/// POST /countries/refresh
async fn refresh_handler(State(state): State<AppState>) -> Result<Json<RefreshResponse>> {
    let report = refresh_countries(&state.db, &state.sources, &state.summary)
        .await
        .inspect_err(|e| log::error!("Refresh failed: {}", e))?;

    Ok(Json(RefreshResponse {
        message: "Countries data refreshed successfully",
        report,
    }))
}

/// GET /countries?region={region}&currency={code}&sort={sort}
async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Country>>> {
    let filter = params.into_filter()?;
    let conn = lock(&state.db)?;
    Ok(Json(list_countries(&conn, &filter)?))
}

/// GET /countries/{name}
async fn get_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Country>> {
    let conn = lock(&state.db)?;
    get_country_by_name(&conn, &name)?
        .map(Json)
        .ok_or(CountryError::NotFound(name))
}

/// DELETE /countries/{name}
/// Redraws the summary image so it matches the remaining rows
async fn delete_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    let deleted = {
        let conn = lock(&state.db)?;
        delete_country(&conn, &name)?
    };
    if !deleted {
        return Err(CountryError::NotFound(name));
    }
    log::info!("Deleted country: {}", name);

    if let Err(e) = regenerate_summary(&state.db, &state.summary) {
        log::warn!("Failed to regenerate summary image after delete: {}", e);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusSnapshot>> {
    let conn = lock(&state.db)?;
    Ok(Json(get_status(&conn)?))
}

/// GET /countries/image
/// Serves the image written by the last successful refresh; never renders inline
async fn image_handler(State(state): State<AppState>) -> Result<Response> {
    let bytes = state
        .summary
        .load()?
        .ok_or(CountryError::SummaryImageMissing)?;

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("image/png"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header::HeaderValue::from_static("inline; filename=\"countries_summary.png\""),
    );
    Ok(response)
}

/// Build the web server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/countries", get(list_handler))
        .route("/countries/refresh", post(refresh_handler))
        .route("/countries/image", get(image_handler))
        .route("/countries/{name}", get(get_handler).delete(delete_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping and
/// stops on Ctrl+C.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Countries API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
