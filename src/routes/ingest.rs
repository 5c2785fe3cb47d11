//! Station-facing ingestion endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use crate::error::AppResult;
use crate::ingest::{self, IngestPayload};
use crate::models::TransmissionConfig;

// ---

const API_KEY_HEADER: &str = "x-api-key";

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/data/ingest", post(handler))
}

#[derive(Serialize)]
struct IngestResponse {
    success: bool,
    timestamp: DateTime<Utc>,
    config: TransmissionConfig,
}

/// `POST /api/data/ingest` with header `X-API-Key`.
async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<IngestPayload>, JsonRejection>,
) -> AppResult<Json<IngestResponse>> {
    // ---
    // Credential is checked before the body is looked at
    let api_key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    let station = ingest::authenticate(&state.pool, api_key).await?;
    let Json(payload) = payload?;

    let outcome = ingest::record(&state.pool, station, &payload).await?;

    Ok(Json(IngestResponse {
        success: true,
        timestamp: outcome.timestamp,
        config: outcome.config,
    }))
}
