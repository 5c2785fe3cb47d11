//! Alert listing and acknowledgement.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::AppState;
use crate::alerts::{self, Alert};
use crate::error::AppResult;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/alerts", get(list))
}

pub fn protected() -> Router<AppState> {
    // ---
    Router::new().route("/api/alerts/{id}/acknowledge", post(acknowledge))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertsQuery {
    station_id: Option<String>,
    /// `true` includes acknowledged alerts as well.
    #[serde(default)]
    acknowledged: bool,
}

/// `GET /api/alerts?stationId=&acknowledged=`
async fn list(
    State(state): State<AppState>,
    query: Result<Query<AlertsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Alert>>> {
    // ---
    let Query(params) = query?;
    let rows = alerts::list(&state.pool, params.station_id.as_deref(), params.acknowledged).await?;
    Ok(Json(rows))
}

/// `POST /api/alerts/{id}/acknowledge`
///
/// Succeeds for unknown ids as well.
async fn acknowledge(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = path?;
    let matched = alerts::acknowledge(&state.pool, id).await?;
    if !matched {
        debug!(alert_id = id, "Acknowledge for unknown alert ignored");
    }
    Ok(Json(json!({ "success": true })))
}
