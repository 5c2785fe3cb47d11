//! Station registry: identity, location, transmission config and credential.
//!
//! API keys are 256-bit random values, hex encoded. A key is returned exactly
//! once (by [`create`] or [`regenerate_api_key`]) and never read back out.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Station, TransmissionConfig};

// ---

const STATION_COLUMNS: &str = "id, name, description, location_lat, location_lng, altitude, \
     created_at, last_seen, is_active, config_sf, config_bw, config_interval";

const SF_RANGE: std::ops::RangeInclusive<i64> = 7..=12;
const BW_ALLOWED_KHZ: [i64; 3] = [125, 250, 500];
const MIN_INTERVAL_MS: i64 = 10_000;

/// Request body for station creation.
#[derive(Debug, Default, Deserialize)]
pub struct NewStation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub altitude: Option<f64>,
}

/// Partial update of the descriptive fields. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct StationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub altitude: Option<f64>,
}

/// Partial update of the transmission config.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct ConfigUpdate {
    pub sf: Option<i64>,
    pub bw: Option<i64>,
    #[serde(alias = "intervalMs")]
    pub interval: Option<i64>,
}

impl ConfigUpdate {
    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> AppResult<()> {
        // ---
        if let Some(sf) = self.sf {
            if !SF_RANGE.contains(&sf) {
                return Err(AppError::Validation("SF must be between 7 and 12".into()));
            }
        }
        if let Some(bw) = self.bw {
            if !BW_ALLOWED_KHZ.contains(&bw) {
                return Err(AppError::Validation("BW must be 125, 250 or 500".into()));
            }
        }
        if let Some(interval) = self.interval {
            if interval < MIN_INTERVAL_MS {
                return Err(AppError::Validation(format!(
                    "Minimum interval is {MIN_INTERVAL_MS} ms"
                )));
            }
        }
        Ok(())
    }

    /// Overlay the present values on `current`.
    pub fn apply(&self, current: TransmissionConfig) -> TransmissionConfig {
        TransmissionConfig {
            spreading_factor: self.sf.unwrap_or(current.spreading_factor),
            bandwidth_khz: self.bw.unwrap_or(current.bandwidth_khz),
            interval_ms: self.interval.unwrap_or(current.interval_ms),
        }
    }
}

/// Identity handed back by [`create`]; the only time the key is visible.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedStation {
    pub id: String,
    pub name: String,
    pub api_key: String,
}

/// Active station plus reading totals, as shown in the station list.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StationListing {
    // ---
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub station: Station,
    pub total_readings: i64,
    pub last_reading: Option<DateTime<Utc>>,
}

fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

fn non_blank(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Register a new station with default transmission config.
///
/// Id and key are written by a single INSERT, so a failure never leaves a
/// half-registered station reachable by lookup.
pub async fn create(pool: &SqlitePool, new: NewStation) -> AppResult<CreatedStation> {
    // ---
    let name = non_blank(new.name).ok_or_else(|| AppError::Validation("Name is required".into()))?;
    let id = Uuid::new_v4().to_string();
    let api_key = generate_api_key();
    let config = TransmissionConfig::default();

    sqlx::query(
        r#"
        INSERT INTO stations (
            id, name, description, location_lat, location_lng, altitude,
            api_key, created_at, config_sf, config_bw, config_interval
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&name)
    .bind(&new.description)
    .bind(new.location_lat)
    .bind(new.location_lng)
    .bind(new.altitude)
    .bind(&api_key)
    .bind(Utc::now())
    .bind(config.spreading_factor)
    .bind(config.bandwidth_khz)
    .bind(config.interval_ms)
    .execute(pool)
    .await?;

    info!(station_id = %id, name = %name, "Station created");
    Ok(CreatedStation { id, name, api_key })
}

/// Look up a station by id, active or not.
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Station>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Station>(&format!("SELECT {STATION_COLUMNS} FROM stations WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Like [`get`], but a missing station is an error.
pub async fn require(pool: &SqlitePool, id: &str) -> AppResult<Station> {
    get(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".into()))
}

/// Resolve an ingestion credential. Inactive stations are returned too; the
/// caller decides what to do with them.
pub async fn get_by_api_key(pool: &SqlitePool, api_key: &str) -> Result<Option<Station>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Station>(&format!(
        "SELECT {STATION_COLUMNS} FROM stations WHERE api_key = ?"
    ))
    .bind(api_key)
    .fetch_optional(pool)
    .await
}

/// All active stations ordered by name, with reading totals.
pub async fn list(pool: &SqlitePool) -> Result<Vec<StationListing>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, StationListing>(&format!(
        r#"
        SELECT {STATION_COLUMNS},
            (SELECT COUNT(*) FROM readings r WHERE r.station_id = stations.id) AS total_readings,
            (SELECT MAX(r.timestamp) FROM readings r WHERE r.station_id = stations.id) AS last_reading
        FROM stations
        WHERE is_active = 1
        ORDER BY name
        "#
    ))
    .fetch_all(pool)
    .await
}

/// Active stations only, without totals. Used by the dashboard.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Station>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Station>(&format!(
        "SELECT {STATION_COLUMNS} FROM stations WHERE is_active = 1 ORDER BY name"
    ))
    .fetch_all(pool)
    .await
}

/// Partial update of name, description and location.
pub async fn update(pool: &SqlitePool, id: &str, changes: StationUpdate) -> AppResult<()> {
    // ---
    if changes.name.is_some() && non_blank(changes.name.clone()).is_none() {
        return Err(AppError::Validation("Name cannot be empty".into()));
    }
    require(pool, id).await?;

    sqlx::query(
        r#"
        UPDATE stations SET
            name         = COALESCE(?, name),
            description  = COALESCE(?, description),
            location_lat = COALESCE(?, location_lat),
            location_lng = COALESCE(?, location_lng),
            altitude     = COALESCE(?, altitude)
        WHERE id = ?
        "#,
    )
    .bind(non_blank(changes.name))
    .bind(changes.description)
    .bind(changes.location_lat)
    .bind(changes.location_lng)
    .bind(changes.altitude)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Validate and store a new transmission config; returns the config the
/// station will receive on its next ingestion.
pub async fn update_config(
    pool: &SqlitePool,
    id: &str,
    changes: ConfigUpdate,
) -> AppResult<TransmissionConfig> {
    // ---
    changes.validate()?;
    let station = require(pool, id).await?;
    let config = changes.apply(station.config);

    sqlx::query(
        "UPDATE stations SET config_sf = ?, config_bw = ?, config_interval = ? WHERE id = ?",
    )
    .bind(config.spreading_factor)
    .bind(config.bandwidth_khz)
    .bind(config.interval_ms)
    .bind(id)
    .execute(pool)
    .await?;

    info!(station_id = %id, ?config, "Transmission config updated");
    Ok(config)
}

/// Record contact from a station.
pub async fn touch_last_seen(
    pool: &SqlitePool,
    id: &str,
    seen_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query("UPDATE stations SET last_seen = ? WHERE id = ?")
        .bind(seen_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Issue a new key. The previous key stops resolving immediately.
pub async fn regenerate_api_key(pool: &SqlitePool, id: &str) -> AppResult<String> {
    // ---
    require(pool, id).await?;
    let api_key = generate_api_key();

    sqlx::query("UPDATE stations SET api_key = ? WHERE id = ?")
        .bind(&api_key)
        .bind(id)
        .execute(pool)
        .await?;

    info!(station_id = %id, "API key regenerated");
    Ok(api_key)
}

/// Soft delete. Readings and alerts stay queryable.
pub async fn deactivate(pool: &SqlitePool, id: &str) -> AppResult<()> {
    // ---
    require(pool, id).await?;

    sqlx::query("UPDATE stations SET is_active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    info!(station_id = %id, "Station deactivated");
    Ok(())
}
