//! Station registry endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::AppResult;
use crate::models::{Reading, ReadingStats, Station, Window};
use crate::readings;
use crate::stations::{self, ConfigUpdate, NewStation, StationListing, StationUpdate};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/stations", get(list))
        .route("/api/stations/{id}", get(detail))
}

pub fn protected() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/stations", post(create))
        .route("/api/stations/{id}", put(update).delete(deactivate))
        .route("/api/stations/{id}/config", put(update_config))
        .route("/api/stations/{id}/regenerate-key", post(regenerate_key))
}

#[derive(Serialize)]
struct TodayStats {
    today: ReadingStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StationDetail {
    #[serde(flatten)]
    station: Station,
    last_reading: Option<Reading>,
    stats: TodayStats,
}

/// `GET /api/stations`
async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<StationListing>>> {
    Ok(Json(stations::list(&state.pool).await?))
}

/// `GET /api/stations/{id}` with latest reading and 24h stats.
async fn detail(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<StationDetail>> {
    // ---
    let Path(id) = path?;
    let station = stations::require(&state.pool, &id).await?;
    let last_reading = readings::latest(&state.pool, &id).await?;
    let today = readings::stats(&state.pool, &id, Window::LastDay).await?;

    Ok(Json(StationDetail {
        station,
        last_reading,
        stats: TodayStats { today },
    }))
}

/// `POST /api/stations`; the only response that ever shows the key.
async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewStation>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    // ---
    let Json(new) = body?;
    let created = stations::create(&state.pool, new).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": created.id,
            "name": created.name,
            "apiKey": created.api_key,
            "message": "Station created. Store the API key now, it will not be shown again.",
        })),
    ))
}

/// `PUT /api/stations/{id}`
async fn update(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<StationUpdate>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = path?;
    let Json(changes) = body?;
    stations::update(&state.pool, &id, changes).await?;
    Ok(Json(json!({ "message": "Station updated" })))
}

/// `PUT /api/stations/{id}/config`
async fn update_config(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = path?;
    let Json(changes) = body?;
    let pending = stations::update_config(&state.pool, &id, changes).await?;

    Ok(Json(json!({
        "message": "Configuration updated, applied on the station's next transmission",
        "pendingConfig": pending,
    })))
}

/// `DELETE /api/stations/{id}` (soft delete)
async fn deactivate(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = path?;
    stations::deactivate(&state.pool, &id).await?;
    Ok(Json(json!({ "message": "Station deactivated" })))
}

/// `POST /api/stations/{id}/regenerate-key`
async fn regenerate_key(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = path?;
    let api_key = stations::regenerate_api_key(&state.pool, &id).await?;

    Ok(Json(json!({
        "apiKey": api_key,
        "message": "API key regenerated. Update the gateway configuration.",
    })))
}
