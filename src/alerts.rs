//! Alert engine: fixed-threshold evaluation of incoming readings.
//!
//! Thresholds are global constants. There is no hysteresis and no
//! coalescing: a station that stays out of bounds for N readings produces N
//! alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::models::SensorFields;

// ---

pub const TEMP_HIGH_C: f64 = 40.0;
pub const FROST_C: f64 = -5.0;
pub const SOIL_DRY_VWC: f64 = 15.0;
pub const SIGNAL_WEAK_DBM: f64 = -120.0;

/// Maximum rows returned by [`list`].
pub const LIST_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    TempHigh,
    FrostWarning,
    SoilDry,
    SignalWeak,
}

/// A threshold violation found in one reading, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: AlertKind,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// Persisted alert, joined with its station's name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Alert {
    // ---
    pub id: i64,
    pub station_id: String,
    #[sqlx(default)]
    pub station_name: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
}

/// Check a reading against every threshold. Absent fields never trigger.
pub fn evaluate(fields: &SensorFields) -> Vec<Violation> {
    // ---
    let mut found = Vec::new();

    if let Some(t) = fields.temp_air {
        if t > TEMP_HIGH_C {
            found.push(Violation {
                kind: AlertKind::TempHigh,
                message: format!("Air temperature too high: {t}°C"),
                value: t,
                threshold: TEMP_HIGH_C,
            });
        }
        if t < FROST_C {
            found.push(Violation {
                kind: AlertKind::FrostWarning,
                message: format!("Frost warning: {t}°C"),
                value: t,
                threshold: FROST_C,
            });
        }
    }

    if let Some(vwc) = fields.vwc_soil {
        if vwc < SOIL_DRY_VWC {
            found.push(Violation {
                kind: AlertKind::SoilDry,
                message: format!("Soil is dry, consider irrigation: {vwc}% VWC"),
                value: vwc,
                threshold: SOIL_DRY_VWC,
            });
        }
    }

    if let Some(rssi) = fields.rssi {
        if rssi < SIGNAL_WEAK_DBM {
            found.push(Violation {
                kind: AlertKind::SignalWeak,
                message: format!("Weak LoRa signal: {rssi} dBm"),
                value: rssi,
                threshold: SIGNAL_WEAK_DBM,
            });
        }
    }

    found
}

/// Evaluate a reading and append one alert row per violation.
/// Returns how many alerts were written.
pub async fn check_and_record(
    pool: &SqlitePool,
    station_id: &str,
    fields: &SensorFields,
) -> Result<usize, sqlx::Error> {
    // ---
    let violations = evaluate(fields);
    let created_at = Utc::now();

    for v in &violations {
        sqlx::query(
            r#"
            INSERT INTO alerts (station_id, type, message, value, threshold, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(station_id)
        .bind(v.kind)
        .bind(&v.message)
        .bind(v.value)
        .bind(v.threshold)
        .bind(created_at)
        .execute(pool)
        .await?;
    }

    Ok(violations.len())
}

/// Newest-first alerts, optionally for one station. Unacknowledged only
/// unless `include_acknowledged` is set. Capped at [`LIST_LIMIT`].
pub async fn list(
    pool: &SqlitePool,
    station_id: Option<&str>,
    include_acknowledged: bool,
) -> Result<Vec<Alert>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Alert>(
        r#"
        SELECT a.id, a.station_id, s.name AS station_name, a.type, a.message,
               a.value, a.threshold, a.created_at, a.acknowledged
        FROM alerts a
        JOIN stations s ON a.station_id = s.id
        WHERE (?1 IS NULL OR a.station_id = ?1)
          AND (?2 OR a.acknowledged = 0)
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT ?3
        "#,
    )
    .bind(station_id)
    .bind(include_acknowledged)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await
}

/// Unacknowledged alerts of one station.
pub async fn count_active(pool: &SqlitePool, station_id: &str) -> Result<i64, sqlx::Error> {
    // ---
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE station_id = ? AND acknowledged = 0")
            .bind(station_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Unacknowledged alerts across all stations.
pub async fn count_active_all(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    // ---
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE acknowledged = 0")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Mark an alert acknowledged. One-way and idempotent; an unknown id is a
/// silent no-op. Returns whether a row matched.
pub async fn acknowledge(pool: &SqlitePool, alert_id: i64) -> Result<bool, sqlx::Error> {
    // ---
    let result = sqlx::query("UPDATE alerts SET acknowledged = 1 WHERE id = ?")
        .bind(alert_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::schema::test_pool;
    use crate::stations::{self, NewStation};

    fn reading(temp_air: Option<f64>, vwc_soil: Option<f64>, rssi: Option<f64>) -> SensorFields {
        SensorFields {
            temp_air,
            vwc_soil,
            rssi,
            ..Default::default()
        }
    }

    async fn station(pool: &SqlitePool, name: &str) -> String {
        let new = NewStation {
            name: Some(name.to_string()),
            ..Default::default()
        };
        stations::create(pool, new).await.unwrap().id
    }

    #[test]
    fn test_normal_reading_raises_nothing() {
        // ---
        assert!(evaluate(&reading(Some(22.0), Some(35.0), Some(-90.0))).is_empty());
        assert!(evaluate(&SensorFields::default()).is_empty());
    }

    #[test]
    fn test_temp_high() {
        // ---
        let found = evaluate(&reading(Some(41.0), None, None));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AlertKind::TempHigh);
        assert_eq!(found[0].value, 41.0);
        assert_eq!(found[0].threshold, 40.0);
        assert!(found[0].message.contains("41"));
    }

    #[test]
    fn test_thresholds_are_strict() {
        // ---
        assert!(evaluate(&reading(Some(40.0), None, None)).is_empty());
        assert!(evaluate(&reading(Some(-5.0), None, None)).is_empty());
        assert!(evaluate(&reading(None, Some(15.0), None)).is_empty());
        assert!(evaluate(&reading(None, None, Some(-120.0))).is_empty());
    }

    #[test]
    fn test_missing_temp_never_raises_temp_alerts() {
        // ---
        let found = evaluate(&reading(None, Some(5.0), Some(-130.0)));
        let kinds: Vec<_> = found.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![AlertKind::SoilDry, AlertKind::SignalWeak]);
    }

    #[test]
    fn test_conditions_are_independent() {
        // ---
        let found = evaluate(&reading(Some(-8.5), Some(3.0), Some(-125.0)));
        let kinds: Vec<_> = found.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![AlertKind::FrostWarning, AlertKind::SoilDry, AlertKind::SignalWeak]
        );
        assert_eq!(found[0].message, "Frost warning: -8.5°C");
    }

    #[tokio::test]
    async fn test_repeated_violations_are_not_coalesced() {
        // ---
        let pool = test_pool().await;
        let id = station(&pool, "Alpha").await;
        let hot = reading(Some(45.0), None, None);

        for _ in 0..3 {
            assert_eq!(check_and_record(&pool, &id, &hot).await.unwrap(), 1);
        }
        assert_eq!(count_active(&pool, &id).await.unwrap(), 3);

        let listed = list(&pool, Some(&id), false).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].kind, AlertKind::TempHigh);
        assert_eq!(listed[0].station_name.as_deref(), Some("Alpha"));
    }

    #[tokio::test]
    async fn test_acknowledge_is_idempotent_and_lenient() {
        // ---
        let pool = test_pool().await;
        let id = station(&pool, "Alpha").await;
        check_and_record(&pool, &id, &reading(None, Some(2.0), None))
            .await
            .unwrap();
        let alert_id = list(&pool, None, false).await.unwrap()[0].id;

        assert!(acknowledge(&pool, alert_id).await.unwrap());
        assert!(acknowledge(&pool, alert_id).await.unwrap());
        assert!(!acknowledge(&pool, 9_999).await.unwrap());

        assert!(list(&pool, None, false).await.unwrap().is_empty());
        let all = list(&pool, None, true).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].acknowledged);
        assert_eq!(count_active_all(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_station() {
        // ---
        let pool = test_pool().await;
        let a = station(&pool, "Alpha").await;
        let b = station(&pool, "Bravo").await;
        check_and_record(&pool, &a, &reading(Some(50.0), None, None)).await.unwrap();
        check_and_record(&pool, &b, &reading(Some(-9.0), Some(1.0), None)).await.unwrap();

        assert_eq!(list(&pool, Some(&a), false).await.unwrap().len(), 1);
        assert_eq!(list(&pool, Some(&b), false).await.unwrap().len(), 2);
        assert_eq!(list(&pool, None, false).await.unwrap().len(), 3);
        assert_eq!(count_active_all(&pool).await.unwrap(), 3);
    }
}
