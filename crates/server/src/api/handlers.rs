//! HTTP request handlers and shared application state.

use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use axum::extract::{Path, Query, State};
use axum::Json;
use cinesearch_core::config;
use cinesearch_core::engine::{QuerySpec, SearchEngine};
use cinesearch_core::fusion::Weights;
use cinesearch_core::movie::Movie;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to every handler via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub prometheus_handle: PrometheusHandle,
    pub index_url: String,
    pub embedder_url: String,
    pub start_time: Instant,
}

fn validate_query(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }
    Ok(())
}

fn validate_size(size: usize) -> Result<(), ApiError> {
    if size == 0 || size > config::MAX_SIZE {
        return Err(ApiError::BadRequest(format!(
            "size must be 1-{}",
            config::MAX_SIZE
        )));
    }
    Ok(())
}

fn resolve_weights(weights: Option<WeightsRequest>) -> Result<Weights, ApiError> {
    let weights: Weights = weights.map(Into::into).unwrap_or_default();
    if !weights.is_valid() {
        return Err(ApiError::BadRequest(
            "weights must be finite and non-negative".into(),
        ));
    }
    Ok(weights)
}

fn query_spec(req: &QueryRequest) -> Result<QuerySpec, ApiError> {
    validate_query(&req.query)?;
    validate_size(req.size)?;
    let mut spec = QuerySpec::new(req.query.clone());
    spec.size = req.size;
    spec.min_score = req.min_score;
    spec.filters = req.filters.clone();
    spec.weights = resolve_weights(req.weights)?;
    spec.strict = req.strict;
    Ok(spec)
}

/// `POST /api/v1/movies/hybrid-search`
pub async fn hybrid_search(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let spec = query_spec(&req)?;
    let results = state.engine.hybrid(&spec).await?;
    metrics::record_search("hybrid", results.len());
    Ok(Json(results))
}

/// `POST /api/v1/movies/search`
pub async fn semantic_search(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let spec = query_spec(&req)?;
    let results = state.engine.semantic(&spec).await?;
    metrics::record_search("semantic", results.len());
    Ok(Json(results))
}

/// `GET /api/v1/movies/search`
pub async fn keyword_search(
    State(state): State<AppState>,
    Query(params): Query<KeywordSearchParams>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    validate_query(&params.query)?;
    validate_size(params.size)?;
    let mut spec = QuerySpec::new(params.query.clone());
    spec.size = params.size;
    spec.filters = params.filters();
    let results = state.engine.keyword(&spec).await?;
    metrics::record_search("keyword", results.len());
    Ok(Json(results))
}

/// `GET /api/v1/movies/:id`
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<Movie>, ApiError> {
    match state.engine.movie_by_id(&movie_id).await? {
        Some(movie) => Ok(Json(movie)),
        None => Err(ApiError::NotFound(format!(
            "movie with id '{movie_id}' not found"
        ))),
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        index: state.index_url.clone(),
        embedder: state.embedder_url.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}
