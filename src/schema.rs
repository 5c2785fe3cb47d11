//! Database schema management for `gipis-weather`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::SqlitePool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `stations` registry, the `readings` time series and the
/// `alerts` log. Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Station registry; api_key is the ingestion credential
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id              TEXT PRIMARY KEY,
            name            TEXT    NOT NULL,
            description     TEXT,
            location_lat    REAL,
            location_lng    REAL,
            altitude        REAL,
            api_key         TEXT    NOT NULL,
            created_at      TEXT    NOT NULL,
            last_seen       TEXT,
            is_active       INTEGER NOT NULL DEFAULT 1,
            config_sf       INTEGER NOT NULL DEFAULT 9,
            config_bw       INTEGER NOT NULL DEFAULT 125,
            config_interval INTEGER NOT NULL DEFAULT 600000
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // One row per accepted packet, every sensor column nullable
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id      TEXT NOT NULL REFERENCES stations(id),
            timestamp       TEXT NOT NULL,
            packet_id       INTEGER,
            temp_air        REAL,
            hum_air         REAL,
            temp_soil       REAL,
            vwc_soil        REAL,
            pressure        REAL,
            par             REAL,
            solar_radiation REAL,
            precipitation   REAL,
            rssi            REAL,
            snr             REAL,
            freq_error      REAL,
            battery_voltage REAL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id   TEXT    NOT NULL REFERENCES stations(id),
            type         TEXT    NOT NULL,
            message      TEXT    NOT NULL,
            value        REAL    NOT NULL,
            threshold    REAL    NOT NULL,
            created_at   TEXT    NOT NULL,
            acknowledged INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Authentication lookup must hit a unique index
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_stations_api_key
            ON stations (api_key);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_station_time
            ON readings (station_id, timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_timestamp
            ON readings (timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alerts_station
            ON alerts (station_id, acknowledged);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Fresh in-memory database with the schema applied.
///
/// Pinned to a single connection: every `sqlite::memory:` connection is its
/// own database.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    // ---
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    create_schema(&pool).await.expect("create schema");
    pool
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        // ---
        let pool = test_pool().await;
        create_schema(&pool).await.unwrap();

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('stations', 'readings', 'alerts')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 3);
    }
}
