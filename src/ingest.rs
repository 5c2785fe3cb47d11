//! Ingestion pipeline: credential → reading → last contact → alerts → config.
//!
//! Persistence failure aborts before anything else is touched. The response
//! carries the station's current transmission config; that is the only way
//! a config change ever reaches a station.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{SensorFields, Station, TransmissionConfig};
use crate::{alerts, readings, stations};

// ---

/// Body of an ingestion request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestPayload {
    // ---
    /// Client sequence number; stored as-is, never deduplicated.
    #[serde(default, alias = "packetId")]
    pub packet_id: Option<i64>,

    #[serde(flatten)]
    pub fields: SensorFields,
}

/// What an accepted reading produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub station_id: String,
    pub timestamp: DateTime<Utc>,
    pub config: TransmissionConfig,
    pub alerts_raised: usize,
}

/// Resolve an ingestion credential to an active station.
pub async fn authenticate(pool: &SqlitePool, api_key: Option<&str>) -> AppResult<Station> {
    // ---
    let api_key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Unauthorized("API key required".into()))?;

    let station = stations::get_by_api_key(pool, api_key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".into()))?;

    if !station.is_active {
        warn!(station_id = %station.id, "Rejected reading from deactivated station");
        return Err(AppError::Unauthorized("Station is deactivated".into()));
    }
    Ok(station)
}

/// Store `payload` for an authenticated station.
pub async fn record(
    pool: &SqlitePool,
    station: Station,
    payload: &IngestPayload,
) -> AppResult<IngestOutcome> {
    // ---
    let timestamp = readings::insert(pool, &station.id, payload.packet_id, &payload.fields).await?;
    stations::touch_last_seen(pool, &station.id, timestamp).await?;
    let alerts_raised = alerts::check_and_record(pool, &station.id, &payload.fields).await?;

    // Config may have been changed while this request was in flight
    let config = stations::get(pool, &station.id)
        .await?
        .map_or(station.config, |s| s.config);

    info!(
        station_id = %station.id,
        packet_id = ?payload.packet_id,
        alerts_raised,
        "Reading ingested"
    );

    Ok(IngestOutcome {
        station_id: station.id,
        timestamp,
        config,
        alerts_raised,
    })
}
