//! Per-station reading queries, CSV export and age-based cleanup.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::AppState;
use crate::dashboard::{self, ExportSelection};
use crate::error::{AppError, AppResult};
use crate::models::{Reading, ReadingStats, Window};
use crate::readings;

// ---

const DEFAULT_HISTORY_LIMIT: u32 = 100;
const DEFAULT_RETENTION_DAYS: u32 = 90;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/data/{station_id}/latest", get(latest))
        .route("/api/data/{station_id}/history", get(history))
        .route("/api/data/{station_id}/stats", get(stats))
        .route("/api/data/{station_id}/export", get(export))
}

pub fn protected() -> Router<AppState> {
    // ---
    Router::new().route("/api/data/cleanup", delete(cleanup))
}

/// Query parameters shared by history and export.
///
/// A range is used only when both `from` and `to` are given; it takes
/// priority over `limit`.
#[derive(Debug, Deserialize)]
struct ReadingsQuery {
    limit: Option<u32>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl ReadingsQuery {
    fn range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.from.zip(self.to)
    }
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    period: Option<String>,
}

#[derive(Serialize)]
struct StatsResponse {
    period: &'static str,
    #[serde(flatten)]
    stats: ReadingStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CleanupQuery {
    older_than: Option<u32>,
}

/// `GET /api/data/{station_id}/latest`
async fn latest(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Reading>> {
    // ---
    let Path(station_id) = path?;
    readings::latest(&state.pool, &station_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No data available".into()))
}

/// `GET /api/data/{station_id}/history?limit=&from=&to=`
///
/// Without a range: newest first, `limit` capped by configuration.
/// With a range: chronological.
async fn history(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ReadingsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Reading>>> {
    // ---
    let Path(station_id) = path?;
    let Query(params) = query?;
    let rows = match params.range() {
        Some((from, to)) => readings::history_range(&state.pool, &station_id, from, to).await?,
        None => {
            let limit = params
                .limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .min(state.config.history_max_limit);
            readings::history(&state.pool, &station_id, limit).await?
        }
    };

    debug!(station_id = %station_id, rows = rows.len(), "History served");
    Ok(Json(rows))
}

/// `GET /api/data/{station_id}/stats?period=1h|24h|7d|30d`
///
/// `period` in the reply names the window actually used, so an unknown
/// label comes back as `24h`.
async fn stats(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> AppResult<Json<StatsResponse>> {
    // ---
    let Path(station_id) = path?;
    let Query(params) = query?;
    let window = Window::from_period(params.period.as_deref());
    let stats = readings::stats(&state.pool, &station_id, window).await?;

    Ok(Json(StatsResponse {
        period: window.label(),
        stats,
    }))
}

/// `GET /api/data/{station_id}/export?from=&to=&limit=`
async fn export(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ReadingsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    // ---
    let Path(station_id) = path?;
    let Query(params) = query?;
    let max = state.config.export_max_limit;
    let selection = match params.range() {
        Some((from, to)) => ExportSelection::Range { from, to },
        None => ExportSelection::Latest(params.limit.unwrap_or(max).min(max)),
    };

    let csv = dashboard::export_csv(&state.pool, &station_id, selection).await?;
    let disposition = format!("attachment; filename=station_{station_id}_data.csv");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// `DELETE /api/data/cleanup?olderThan=<days>`
async fn cleanup(
    State(state): State<AppState>,
    query: Result<Query<CleanupQuery>, QueryRejection>,
) -> AppResult<Json<serde_json::Value>> {
    // ---
    let Query(params) = query?;
    let days = params.older_than.unwrap_or(DEFAULT_RETENTION_DAYS);
    let deleted = readings::delete_older_than(&state.pool, days).await?;

    info!(older_than_days = days, deleted, "Old readings removed");
    Ok(Json(json!({ "success": true, "deletedRows": deleted })))
}
