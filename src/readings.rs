//! Reading store: time-series rows per station.
//!
//! Native order is most-recent-first. Only [`history_range`] and [`series`]
//! return chronological order; callers of [`history`] reverse when needed.
//! Time windows are computed here from wall-clock `now` and bound as
//! parameters, so every timestamp comparison sees one encoding.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::{Metric, Reading, ReadingStats, SensorFields, Window};

// ---

/// Hard cap on points returned for one comparison series.
pub const SERIES_MAX_POINTS: i64 = 10_000;

const READING_COLUMNS: &str = "id, station_id, timestamp, packet_id, temp_air, hum_air, \
     temp_soil, vwc_soil, pressure, par, solar_radiation, precipitation, rssi, snr, \
     freq_error, battery_voltage";

/// One point of a single-metric series.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Network-wide activity over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct Tally {
    pub active_stations: i64,
    pub total_readings: i64,
}

/// Append a reading stamped with the server clock. Returns the stamp.
pub async fn insert(
    pool: &SqlitePool,
    station_id: &str,
    packet_id: Option<i64>,
    fields: &SensorFields,
) -> Result<DateTime<Utc>, sqlx::Error> {
    // ---
    let timestamp = Utc::now();
    insert_at(pool, station_id, timestamp, packet_id, fields).await?;
    Ok(timestamp)
}

pub(crate) async fn insert_at(
    pool: &SqlitePool,
    station_id: &str,
    timestamp: DateTime<Utc>,
    packet_id: Option<i64>,
    fields: &SensorFields,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO readings (
            station_id, timestamp, packet_id,
            temp_air, hum_air, temp_soil, vwc_soil,
            pressure, par, solar_radiation, precipitation,
            rssi, snr, freq_error, battery_voltage
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(station_id)
    .bind(timestamp)
    .bind(packet_id)
    .bind(fields.temp_air)
    .bind(fields.hum_air)
    .bind(fields.temp_soil)
    .bind(fields.vwc_soil)
    .bind(fields.pressure)
    .bind(fields.par)
    .bind(fields.solar_radiation)
    .bind(fields.precipitation)
    .bind(fields.rssi)
    .bind(fields.snr)
    .bind(fields.freq_error)
    .bind(fields.battery_voltage)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent reading, if the station ever reported.
pub async fn latest(pool: &SqlitePool, station_id: &str) -> Result<Option<Reading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(&format!(
        "SELECT {READING_COLUMNS} FROM readings WHERE station_id = ? \
         ORDER BY timestamp DESC, id DESC LIMIT 1"
    ))
    .bind(station_id)
    .fetch_optional(pool)
    .await
}

/// Up to `limit` readings, most recent first. The caller caps `limit`.
pub async fn history(
    pool: &SqlitePool,
    station_id: &str,
    limit: u32,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(&format!(
        "SELECT {READING_COLUMNS} FROM readings WHERE station_id = ? \
         ORDER BY timestamp DESC, id DESC LIMIT ?"
    ))
    .bind(station_id)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
}

/// Readings with `from <= timestamp <= to`, chronological.
pub async fn history_range(
    pool: &SqlitePool,
    station_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(&format!(
        "SELECT {READING_COLUMNS} FROM readings \
         WHERE station_id = ? AND timestamp >= ? AND timestamp <= ? \
         ORDER BY timestamp ASC, id ASC"
    ))
    .bind(station_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Aggregates over the trailing `window`, relative to now.
pub async fn stats(
    pool: &SqlitePool,
    station_id: &str,
    window: Window,
) -> Result<ReadingStats, sqlx::Error> {
    // ---
    sqlx::query_as::<_, ReadingStats>(
        r#"
        SELECT
            COUNT(*)           AS count,
            AVG(temp_air)      AS avg_temp_air,
            MIN(temp_air)      AS min_temp_air,
            MAX(temp_air)      AS max_temp_air,
            AVG(hum_air)       AS avg_hum_air,
            AVG(temp_soil)     AS avg_temp_soil,
            AVG(vwc_soil)      AS avg_vwc_soil,
            SUM(precipitation) AS total_precipitation
        FROM readings
        WHERE station_id = ? AND timestamp >= ?
        "#,
    )
    .bind(station_id)
    .bind(window.since(Utc::now()))
    .fetch_one(pool)
    .await
}

/// One metric over the trailing `window`, chronological.
pub async fn series(
    pool: &SqlitePool,
    station_id: &str,
    metric: Metric,
    window: Window,
) -> Result<Vec<SeriesPoint>, sqlx::Error> {
    // ---
    // The column comes from the `Metric` whitelist, never from the request.
    sqlx::query_as::<_, SeriesPoint>(&format!(
        "SELECT timestamp, {} AS value FROM readings \
         WHERE station_id = ? AND timestamp >= ? \
         ORDER BY timestamp ASC, id ASC LIMIT ?",
        metric.column()
    ))
    .bind(station_id)
    .bind(window.since(Utc::now()))
    .bind(SERIES_MAX_POINTS)
    .fetch_all(pool)
    .await
}

/// Distinct reporting stations and reading count since `since`.
pub async fn tally_since(pool: &SqlitePool, since: DateTime<Utc>) -> Result<Tally, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Tally>(
        r#"
        SELECT
            COUNT(DISTINCT station_id) AS active_stations,
            COUNT(*)                   AS total_readings
        FROM readings
        WHERE timestamp >= ?
        "#,
    )
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Delete every reading older than `age_days`. Returns the number removed.
///
/// An age reaching past the earliest representable timestamp matches no row.
pub async fn delete_older_than(pool: &SqlitePool, age_days: u32) -> Result<u64, sqlx::Error> {
    // ---
    let Some(cutoff) = Duration::try_days(i64::from(age_days))
        .and_then(|age| Utc::now().checked_sub_signed(age))
    else {
        return Ok(0);
    };
    let result = sqlx::query("DELETE FROM readings WHERE timestamp < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
