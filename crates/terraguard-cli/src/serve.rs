//! Extraction HTTP API.
//!
//! Endpoints:
//! - GET  /health                 - Liveness of this server
//! - POST /api/extract            - Single deterministic attempt
//! - POST /api/extract/ensemble   - Multi-sample extraction with voting

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use terraguard_ai::{Ensemble, EnsembleError};
use terraguard_core::{ErrorBody, ExtractRequest, ExtractResponse};
use terraguard_llm::TextGenerator;
use tracing::{info, warn};

type AppState<G> = Arc<Ensemble<G>>;

/// Maps request and pipeline failures onto HTTP statuses.
enum ApiError {
    BadBody(JsonRejection),
    Pipeline(EnsembleError),
}

impl From<EnsembleError> for ApiError {
    fn from(e: EnsembleError) -> Self {
        Self::Pipeline(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadBody(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadBody(e) => (
                StatusCode::BAD_REQUEST,
                format!("invalid request: {}", e.body_text()),
            ),
            Self::Pipeline(e) => {
                let status = match e {
                    EnsembleError::EmptyInput => StatusCode::BAD_REQUEST,
                    EnsembleError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, e.to_string())
            }
        };
        warn!(status = status.as_u16(), error = %message, "extraction request failed");
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub fn router<G: TextGenerator + 'static>(ensemble: Ensemble<G>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/extract", post(extract_once::<G>))
        .route("/api/extract/ensemble", post(extract_ensemble::<G>))
        .with_state(Arc::new(ensemble))
}

pub async fn run<G: TextGenerator + 'static>(
    bind: &str,
    ensemble: Ensemble<G>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %bind, facilities = ensemble.directory().len(), "serving extraction API");
    axum::serve(listener, router(ensemble)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn extract_once<G: TextGenerator + 'static>(
    State(ensemble): State<AppState<G>>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(ensemble.extract_once(&req.text).await?))
}

async fn extract_ensemble<G: TextGenerator + 'static>(
    State(ensemble): State<AppState<G>>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(ensemble.run(&req.text, req.samples()).await?))
}
