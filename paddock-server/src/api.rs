//! REST API routes

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use paddock_core::model::{LapListing, SessionKind};
use paddock_core::{build_race_summary, compare_drivers, RaceComparison, SessionKey, SummaryError};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api", get(health))
        .route("/api/race-summary", get(race_summary))
        .route("/api/laps", get(driver_laps))
        .route("/api/race-comparison", get(race_comparison))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Errors ===

/// Request failure rendered as `{"error": msg}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        let status = match &err {
            SummaryError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            SummaryError::DataNotReady(_) => StatusCode::NOT_FOUND,
            SummaryError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        }
        let body = Json(ErrorBody {
            error: &self.message,
        });
        (self.status, body).into_response()
    }
}

// === Health ===

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Paddock API is running" }))
}

// === Query parameters ===

/// Raw session parameters; parsed by hand so every failure gets the JSON
/// error body instead of the extractor's plain-text rejection
#[derive(Deserialize)]
struct SessionParams {
    year: Option<String>,
    event_key: Option<String>,
    session_name: Option<String>,
}

fn missing_parameters() -> SummaryError {
    SummaryError::InvalidParameter("Missing parameters are required.".to_string())
}

/// A required driver parameter, trimmed
fn required_driver(value: Option<String>) -> Result<String, SummaryError> {
    value
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(missing_parameters)
}

impl SessionParams {
    fn session_key(&self) -> Result<SessionKey, SummaryError> {
        let year_text = self.year.as_deref().ok_or_else(missing_parameters)?;
        let event_key = self.event_key.clone().ok_or_else(missing_parameters)?;
        let session_name = self.session_name.clone().ok_or_else(missing_parameters)?;

        let year = year_text.trim().parse::<i32>().map_err(|_| {
            SummaryError::InvalidParameter(format!("Invalid year: {:?}", year_text))
        })?;

        let key = SessionKey::new(year, event_key, session_name);
        key.validate()?;
        Ok(key)
    }
}

#[derive(Deserialize)]
struct SummaryQuery {
    #[serde(flatten)]
    session: SessionParams,
    format: Option<String>,
}

#[derive(Deserialize)]
struct LapsQuery {
    #[serde(flatten)]
    session: SessionParams,
    driver_number: Option<String>,
}

#[derive(Deserialize)]
struct ComparisonQuery {
    #[serde(flatten)]
    session: SessionParams,
    driver1_number: Option<String>,
    driver2_number: Option<String>,
}

// === Summary Endpoint ===

async fn race_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, ApiError> {
    let key = query.session.session_key()?;
    let msgpack = match query.format.as_deref() {
        None | Some("json") => false,
        Some("msgpack") => true,
        Some(other) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Unsupported format: {}", other),
            ))
        }
    };

    tracing::info!("Building summary for {}", key);
    let summary = run_blocking(move || {
        let data = state.source.load(&key)?;
        let kind = SessionKind::from_session_name(&key.session_name);
        build_race_summary(&data, kind, &state.engine)
    })
    .await?;

    if msgpack {
        let bytes = rmp_serde::to_vec_named(&summary).map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode summary: {}", e),
            )
        })?;
        Ok(([(header::CONTENT_TYPE, MSGPACK_CONTENT_TYPE)], bytes).into_response())
    } else {
        Ok(Json(summary).into_response())
    }
}

// === Laps Endpoint ===

async fn driver_laps(
    State(state): State<AppState>,
    Query(query): Query<LapsQuery>,
) -> Result<Json<LapListing>, ApiError> {
    let key = query.session.session_key()?;
    let driver = required_driver(query.driver_number)?;

    let listing = run_blocking(move || {
        let data = state.source.load(&key)?;
        Ok(data.lap_listing(&driver))
    })
    .await?;

    listing.map(Json).ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "No laps found for the specified driver")
    })
}

// === Comparison Endpoint ===

async fn race_comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<RaceComparison>, ApiError> {
    let key = query.session.session_key()?;
    let driver1 = required_driver(query.driver1_number)?;
    let driver2 = required_driver(query.driver2_number)?;

    tracing::info!("Comparing {} and {} in {}", driver1, driver2, key);
    let comparison = run_blocking(move || {
        let data = state.source.load(&key)?;
        compare_drivers(&data, &driver1, &driver2)
    })
    .await?;

    Ok(Json(comparison))
}

/// Run source I/O and the engine off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, SummaryError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("An unexpected error occurred: {}", e),
        )),
    }
}
