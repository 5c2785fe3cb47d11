use std::sync::Arc;

use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, SessionVerifier};
use crate::Config;

mod alerts;
mod dashboard;
mod health;
mod ingest;
mod readings;
mod stations;

// ---

/// Handles shared by every route, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub sessions: Arc<dyn SessionVerifier>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, sessions: Arc<dyn SessionVerifier>) -> Self {
        AppState {
            pool,
            config,
            sessions,
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    // Dashboard mutations sit behind the session seam
    let protected = Router::new()
        .merge(stations::protected())
        .merge(alerts::protected())
        .merge(readings::protected())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .merge(health::router())
        .merge(ingest::router())
        .merge(readings::router())
        .merge(stations::router())
        .merge(alerts::router())
        .merge(dashboard::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
