//! Aggregation and comparison queries backing the dashboard.
//!
//! Each piece is read independently with no shared transaction; a summary
//! may show a latest reading and an alert count taken a few writes apart.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::connectivity::{self, ConnectionStatus};
use crate::models::{Location, Metric, Reading, Window};
use crate::readings::{self, SeriesPoint};
use crate::{alerts, stations};

// ---

/// Column order of the CSV export.
pub const CSV_COLUMNS: [&str; 12] = [
    "timestamp",
    "packet_id",
    "temp_air",
    "hum_air",
    "temp_soil",
    "vwc_soil",
    "pressure",
    "par",
    "solar_radiation",
    "precipitation",
    "rssi",
    "snr",
];

/// Subset of the latest reading shown on a station card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSnapshot {
    pub timestamp: DateTime<Utc>,
    pub temp_air: Option<f64>,
    pub hum_air: Option<f64>,
    pub temp_soil: Option<f64>,
    pub vwc_soil: Option<f64>,
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
}

impl From<Reading> for LatestSnapshot {
    fn from(r: Reading) -> Self {
        LatestSnapshot {
            timestamp: r.timestamp,
            temp_air: r.fields.temp_air,
            hum_air: r.fields.hum_air,
            temp_soil: r.fields.temp_soil,
            vwc_soil: r.fields.vwc_soil,
            rssi: r.fields.rssi,
            snr: r.fields.snr,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub connection_status: ConnectionStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_reading: Option<LatestSnapshot>,
    pub alert_count: i64,
}

/// Network-wide counters over the last 24 hours.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub active_stations: i64,
    pub total_readings_today: i64,
    pub active_alerts: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub stations: Vec<StationSummary>,
    pub global: GlobalStats,
    pub server_time: DateTime<Utc>,
}

/// One station's series in a comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSeries {
    pub station_id: String,
    pub station_name: String,
    pub data: Vec<SeriesPoint>,
}

/// Which readings an export covers. A range wins over a limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportSelection {
    Range {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    Latest(u32),
}

/// Every active station with its latest reading, status and open alerts,
/// plus the global counters.
pub async fn summary(pool: &SqlitePool) -> Result<DashboardSummary, sqlx::Error> {
    // ---
    let now = Utc::now();
    let active = stations::list_active(pool).await?;

    let mut cards = Vec::with_capacity(active.len());
    for station in active {
        let last_reading = readings::latest(pool, &station.id).await?;
        let alert_count = alerts::count_active(pool, &station.id).await?;
        let connection_status =
            connectivity::classify(station.last_seen, station.config.interval_ms, now);

        cards.push(StationSummary {
            id: station.id,
            name: station.name,
            location: station.location,
            connection_status,
            last_seen: station.last_seen,
            last_reading: last_reading.map(LatestSnapshot::from),
            alert_count,
        });
    }

    let tally = readings::tally_since(pool, now - Duration::hours(24)).await?;
    let active_alerts = alerts::count_active_all(pool).await?;

    Ok(DashboardSummary {
        stations: cards,
        global: GlobalStats {
            active_stations: tally.active_stations,
            total_readings_today: tally.total_readings,
            active_alerts,
        },
        server_time: now,
    })
}

/// Time-aligned series of one metric for each requested station.
///
/// Ids need not exist: an unknown id yields an empty series named after the
/// raw id, so callers may ask for a superset.
pub async fn compare(
    pool: &SqlitePool,
    station_ids: &[String],
    metric: Metric,
    window: Window,
) -> Result<Vec<ComparisonSeries>, sqlx::Error> {
    // ---
    let mut result = Vec::with_capacity(station_ids.len());
    for id in station_ids {
        let data = readings::series(pool, id, metric, window).await?;
        let station_name = stations::get(pool, id)
            .await?
            .map_or_else(|| id.clone(), |s| s.name);

        result.push(ComparisonSeries {
            station_id: id.clone(),
            station_name,
            data,
        });
    }
    Ok(result)
}

/// Render readings as CSV in [`CSV_COLUMNS`] order. Missing values are empty
/// fields.
pub fn to_csv(rows: &[Reading]) -> String {
    // ---
    fn cell(out: &mut String, value: Option<f64>) {
        out.push(',');
        if let Some(v) = value {
            let _ = write!(out, "{v}");
        }
    }

    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');

    for r in rows {
        out.push_str(&r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));
        out.push(',');
        if let Some(p) = r.packet_id {
            let _ = write!(out, "{p}");
        }
        let f = &r.fields;
        for value in [
            f.temp_air,
            f.hum_air,
            f.temp_soil,
            f.vwc_soil,
            f.pressure,
            f.par,
            f.solar_radiation,
            f.precipitation,
            f.rssi,
            f.snr,
        ] {
            cell(&mut out, value);
        }
        out.push('\n');
    }
    out
}

/// Chosen readings of a station as CSV, oldest first.
pub async fn export_csv(
    pool: &SqlitePool,
    station_id: &str,
    selection: ExportSelection,
) -> Result<String, sqlx::Error> {
    // ---
    let rows = match selection {
        ExportSelection::Range { from, to } => {
            readings::history_range(pool, station_id, from, to).await?
        }
        ExportSelection::Latest(limit) => {
            let mut rows = readings::history(pool, station_id, limit).await?;
            rows.reverse();
            rows
        }
    };
    Ok(to_csv(&rows))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::SensorFields;
    use crate::schema::test_pool;
    use crate::stations::NewStation;
    use chrono::TimeZone;

    async fn station(pool: &SqlitePool, name: &str) -> String {
        let new = NewStation {
            name: Some(name.to_string()),
            ..Default::default()
        };
        stations::create(pool, new).await.unwrap().id
    }

    fn temp(t: f64) -> SensorFields {
        SensorFields {
            temp_air: Some(t),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_compare_tolerates_unknown_ids() {
        // ---
        let pool = test_pool().await;
        let a = station(&pool, "Alpha").await;
        let b = station(&pool, "Bravo").await;
        let now = Utc::now();
        readings::insert_at(&pool, &a, now - Duration::hours(1), None, &temp(12.0)).await.unwrap();
        readings::insert_at(&pool, &b, now - Duration::hours(2), None, &temp(14.0)).await.unwrap();
        readings::insert_at(&pool, &b, now - Duration::hours(1), None, &temp(15.0)).await.unwrap();

        let ids = vec![a.clone(), b.clone(), "UNKNOWN".to_string()];
        let result = compare(&pool, &ids, Metric::TempAir, Window::LastDay).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].station_name, "Alpha");
        assert_eq!(result[0].data.len(), 1);
        assert_eq!(result[1].station_name, "Bravo");
        assert_eq!(result[1].data[0].value, Some(14.0));
        assert_eq!(result[1].data[1].value, Some(15.0));
        assert_eq!(result[2].station_id, "UNKNOWN");
        assert_eq!(result[2].station_name, "UNKNOWN");
        assert!(result[2].data.is_empty());
    }

    #[tokio::test]
    async fn test_summary_joins_per_station_state() {
        // ---
        let pool = test_pool().await;
        let quiet = station(&pool, "Quiet").await;
        let busy = station(&pool, "Busy").await;
        let retired = station(&pool, "Retired").await;
        stations::deactivate(&pool, &retired).await.unwrap();

        let hot = temp(45.0);
        let ts = readings::insert(&pool, &busy, Some(1), &hot).await.unwrap();
        stations::touch_last_seen(&pool, &busy, ts).await.unwrap();
        alerts::check_and_record(&pool, &busy, &hot).await.unwrap();

        let s = summary(&pool).await.unwrap();
        let names: Vec<_> = s.stations.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Busy", "Quiet"]);

        let busy_card = &s.stations[0];
        assert_eq!(busy_card.connection_status, ConnectionStatus::Online);
        assert_eq!(busy_card.alert_count, 1);
        assert_eq!(busy_card.last_reading.as_ref().unwrap().temp_air, Some(45.0));

        let quiet_card = &s.stations[1];
        assert_eq!(quiet_card.id, quiet);
        assert_eq!(quiet_card.connection_status, ConnectionStatus::Offline);
        assert!(quiet_card.last_reading.is_none());
        assert_eq!(quiet_card.alert_count, 0);

        assert_eq!(s.global.active_stations, 1);
        assert_eq!(s.global.total_readings_today, 1);
        assert_eq!(s.global.active_alerts, 1);
    }

    #[test]
    fn test_csv_header_and_empty_cells() {
        // ---
        let row = Reading {
            id: 1,
            station_id: "s".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
            packet_id: None,
            fields: SensorFields {
                temp_air: Some(21.5),
                rssi: Some(-97.0),
                snr: Some(0.0),
                battery_voltage: Some(3.7),
                ..Default::default()
            },
        };

        let csv = to_csv(&[row]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,packet_id,temp_air,hum_air,temp_soil,vwc_soil,pressure,par,\
             solar_radiation,precipitation,rssi,snr"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2026-03-01T12:30:00.000Z,,21.5,,,,,,,,-97,0"
        );
        assert!(lines.next().is_none());
    }

    #[tokio::test]
    async fn test_export_range_wins_and_is_chronological() {
        // ---
        let pool = test_pool().await;
        let id = station(&pool, "Alpha").await;
        let base = Utc::now() - Duration::hours(10);
        for i in 0..4 {
            readings::insert_at(&pool, &id, base + Duration::hours(i), Some(i), &temp(i as f64))
                .await
                .unwrap();
        }

        let latest = export_csv(&pool, &id, ExportSelection::Latest(2)).await.unwrap();
        let packets: Vec<_> = latest
            .lines()
            .skip(1)
            .map(|l| l.split(',').nth(1).unwrap().to_string())
            .collect();
        assert_eq!(packets, vec!["2", "3"]);

        let range = ExportSelection::Range {
            from: base,
            to: base + Duration::hours(1),
        };
        let ranged = export_csv(&pool, &id, range).await.unwrap();
        assert_eq!(ranged.lines().count(), 3);
    }
}
