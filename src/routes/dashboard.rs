//! Dashboard summary and cross-station comparison.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::dashboard::{self, ComparisonSeries, DashboardSummary};
use crate::error::{AppError, AppResult};
use crate::models::{Metric, Window};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/dashboard", get(summary))
        .route("/api/compare", get(compare))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareQuery {
    /// Comma-separated station ids.
    station_ids: Option<String>,
    metric: Option<String>,
    period: Option<String>,
}

/// `GET /api/dashboard`
async fn summary(State(state): State<AppState>) -> AppResult<Json<DashboardSummary>> {
    Ok(Json(dashboard::summary(&state.pool).await?))
}

/// `GET /api/compare?stationIds=a,b&metric=temp_air&period=24h`
async fn compare(
    State(state): State<AppState>,
    query: Result<Query<CompareQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ComparisonSeries>>> {
    // ---
    let Query(params) = query?;
    let ids: Vec<String> = params
        .station_ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();
    if ids.is_empty() {
        return Err(AppError::Validation("stationIds is required".into()));
    }

    let metric_name = params.metric.as_deref().unwrap_or("temp_air");
    let metric = Metric::from_column(metric_name)
        .ok_or_else(|| AppError::Validation(format!("Unknown metric: {metric_name}")))?;
    let window = Window::from_period(params.period.as_deref());

    Ok(Json(dashboard::compare(&state.pool, &ids, metric, window).await?))
}
