use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, instrument, warn};

use crate::db::{BalanceYearView, EtlRun, Source};
use crate::events::{BalanceEvent, EventBroker};
use crate::services::BalanceService;

const KEEP_ALIVE_SECS: u64 = 20;
const DEFAULT_RUNS_LIMIT: i64 = 20;
const MAX_RUNS_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct AppState {
    pub balance_service: BalanceService,
    pub broker: EventBroker,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct YearsResponse {
    pub years: Vec<i32>,
}

#[derive(Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<Source>,
}

#[derive(Serialize)]
pub struct RunsResponse {
    pub runs: Vec<EtlRun>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub source_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SourcePayload {
    pub source_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/balance/years", get(get_balance_years))
        .route("/balance/{year}", get(get_balance_year))
        .route("/sources", get(get_sources).post(register_source))
        .route("/etl-runs", get(get_etl_runs))
        .route("/events", get(stream_events))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

/// CORS restricted to the configured origins; unparseable origins are skipped
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "ok".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state))]
async fn get_balance_years(
    State(state): State<AppState>,
) -> Result<Json<YearsResponse>, StatusCode> {
    let years = state.balance_service.list_years().await.map_err(|e| {
        error!("Failed to list balance years: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    debug!("Retrieved {} balance years", years.len());
    Ok(Json(YearsResponse { years }))
}

#[instrument(skip(state), fields(year = %year))]
async fn get_balance_year(
    State(state): State<AppState>,
    Path(year): Path<i32>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceYearView>, StatusCode> {
    debug!("Fetching balance for year {} (source {:?})", year, query.source_id);
    let view = state
        .balance_service
        .get_year(year, query.source_id.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to fetch balance for year {}: {}", year, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            warn!("No balance data for year {}", year);
            StatusCode::NOT_FOUND
        })?;

    info!(
        "Retrieved balance {} from source {} ({} observed months)",
        year, view.source_id, view.month_count
    );
    Ok(Json(view))
}

#[instrument(skip(state))]
async fn get_sources(State(state): State<AppState>) -> Result<Json<SourcesResponse>, StatusCode> {
    let sources = state.balance_service.list_sources().await.map_err(|e| {
        error!("Failed to list sources: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(SourcesResponse { sources }))
}

#[instrument(skip(state, payload), fields(source_id = %payload.source_id))]
async fn register_source(
    State(state): State<AppState>,
    Json(payload): Json<SourcePayload>,
) -> Result<Json<StatusResponse>, StatusCode> {
    if payload.source_id.trim().is_empty() || payload.dataset_id.trim().is_empty() {
        warn!("Rejecting source with empty identifiers");
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .balance_service
        .register_source(
            &payload.source_id,
            &payload.dataset_id,
            payload.file_name.as_deref(),
        )
        .await
        .map_err(|e| {
            error!("Failed to register source {}: {}", payload.source_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state.broker.publish(BalanceEvent::dataset_updated(
        payload.dataset_id.as_str(),
        payload.source_id.as_str(),
        None,
        format!("Fuente {} registrada", payload.source_id),
        Vec::new(),
    ));

    info!("Registered source {}", payload.source_id);
    Ok(Json(StatusResponse {
        status: "registered".to_string(),
    }))
}

#[instrument(skip(state))]
async fn get_etl_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<RunsResponse>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RUNS_LIMIT)
        .clamp(1, MAX_RUNS_LIMIT);
    let runs = state.balance_service.recent_runs(limit).await.map_err(|e| {
        error!("Failed to fetch ETL runs: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(RunsResponse { runs }))
}

#[instrument(skip(state))]
async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "New event subscriber ({} active)",
        state.broker.subscriber_count() + 1
    );

    let stream = BroadcastStream::new(state.broker.subscribe()).filter_map(|message| match message {
        Ok(event) => match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!("Event subscriber lagged, skipped {} events", skipped);
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}
