//! Data models for stations, readings and alerts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Spreading factor assigned to freshly created stations.
pub const DEFAULT_SF: i64 = 9;
/// Bandwidth (kHz) assigned to freshly created stations.
pub const DEFAULT_BW_KHZ: i64 = 125;
/// Send interval assigned to freshly created stations (10 minutes).
pub const DEFAULT_INTERVAL_MS: i64 = 600_000;

/// Optional geographic position of a station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    // ---
    #[sqlx(rename = "location_lat")]
    pub lat: Option<f64>,
    #[sqlx(rename = "location_lng")]
    pub lng: Option<f64>,
    pub altitude: Option<f64>,
}

/// LoRa transmission parameters a station adopts on its next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransmissionConfig {
    // ---
    #[serde(rename = "sf")]
    #[sqlx(rename = "config_sf")]
    pub spreading_factor: i64,

    #[serde(rename = "bw")]
    #[sqlx(rename = "config_bw")]
    pub bandwidth_khz: i64,

    #[serde(rename = "interval")]
    #[sqlx(rename = "config_interval")]
    pub interval_ms: i64,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        TransmissionConfig {
            spreading_factor: DEFAULT_SF,
            bandwidth_khz: DEFAULT_BW_KHZ,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

/// Registry record of a station. The API key is absent: it is
/// only ever handed out by create and regenerate.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Station {
    // ---
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    pub location: Location,
    #[sqlx(flatten)]
    pub config: TransmissionConfig,
    pub created_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// The fixed set of sensor values carried by one packet.
///
/// Every member is independently nullable. Deserialization accepts the field
/// names the station firmware sends (`tempAire`, `vwcSuelo`, ...) as well as
/// the column names; serialization always uses the column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorFields {
    // ---
    #[serde(default, alias = "tempAire")]
    pub temp_air: Option<f64>,
    #[serde(default, alias = "humAire")]
    pub hum_air: Option<f64>,
    #[serde(default, alias = "tempSuelo")]
    pub temp_soil: Option<f64>,
    #[serde(default, alias = "vwcSuelo")]
    pub vwc_soil: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub par: Option<f64>,
    #[serde(default, alias = "solarRadiation")]
    pub solar_radiation: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub rssi: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
    #[serde(default, alias = "freqError")]
    pub freq_error: Option<f64>,
    #[serde(default, alias = "batteryVoltage")]
    pub battery_voltage: Option<f64>,
}

/// One persisted reading.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    pub id: i64,
    pub station_id: String,
    pub timestamp: DateTime<Utc>,
    pub packet_id: Option<i64>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub fields: SensorFields,
}

/// Aggregates over a trailing window. Averages are `None` when no row in the
/// window carries the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReadingStats {
    // ---
    pub count: i64,
    pub avg_temp_air: Option<f64>,
    pub min_temp_air: Option<f64>,
    pub max_temp_air: Option<f64>,
    pub avg_hum_air: Option<f64>,
    pub avg_temp_soil: Option<f64>,
    pub avg_vwc_soil: Option<f64>,
    pub total_precipitation: Option<f64>,
}

/// A numeric reading column that can be plotted or compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TempAir,
    HumAir,
    TempSoil,
    VwcSoil,
    Pressure,
    Par,
    SolarRadiation,
    Precipitation,
    Rssi,
    Snr,
    FreqError,
    BatteryVoltage,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::TempAir,
        Metric::HumAir,
        Metric::TempSoil,
        Metric::VwcSoil,
        Metric::Pressure,
        Metric::Par,
        Metric::SolarRadiation,
        Metric::Precipitation,
        Metric::Rssi,
        Metric::Snr,
        Metric::FreqError,
        Metric::BatteryVoltage,
    ];

    /// Column name in the `readings` table.
    pub fn column(self) -> &'static str {
        // ---
        match self {
            Metric::TempAir => "temp_air",
            Metric::HumAir => "hum_air",
            Metric::TempSoil => "temp_soil",
            Metric::VwcSoil => "vwc_soil",
            Metric::Pressure => "pressure",
            Metric::Par => "par",
            Metric::SolarRadiation => "solar_radiation",
            Metric::Precipitation => "precipitation",
            Metric::Rssi => "rssi",
            Metric::Snr => "snr",
            Metric::FreqError => "freq_error",
            Metric::BatteryVoltage => "battery_voltage",
        }
    }

    /// Resolve a column name. Only whitelisted columns ever reach SQL.
    pub fn from_column(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.column() == name)
    }
}

/// Trailing time window used by stats and comparison queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    LastHour,
    #[default]
    LastDay,
    LastWeek,
    LastMonth,
}

impl Window {
    /// Parse a period label (`1h`, `24h`, `7d`, `30d`). Missing or unknown
    /// labels select the last 24 hours.
    pub fn from_period(period: Option<&str>) -> Window {
        // ---
        match period.map(str::trim) {
            Some("1h") => Window::LastHour,
            Some("7d") => Window::LastWeek,
            Some("30d") => Window::LastMonth,
            _ => Window::LastDay,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Window::LastHour => "1h",
            Window::LastDay => "24h",
            Window::LastWeek => "7d",
            Window::LastMonth => "30d",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            Window::LastHour => Duration::hours(1),
            Window::LastDay => Duration::hours(24),
            Window::LastWeek => Duration::days(7),
            Window::LastMonth => Duration::days(30),
        }
    }

    /// Start of the window ending at `now`.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}
