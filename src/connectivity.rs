//! Online/delayed/offline classification from last contact and send interval.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Missed intervals before a station counts as delayed.
const DELAYED_AFTER_INTERVALS: i64 = 2;
/// Missed intervals before a station counts as offline.
const OFFLINE_AFTER_INTERVALS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Online,
    Delayed,
    Offline,
}

/// Classify a station. A station that never reported is offline regardless
/// of its interval.
pub fn classify(
    last_seen: Option<DateTime<Utc>>,
    interval_ms: i64,
    now: DateTime<Utc>,
) -> ConnectionStatus {
    // ---
    let Some(last_seen) = last_seen else {
        return ConnectionStatus::Offline;
    };

    let elapsed_ms = (now - last_seen).num_milliseconds();
    if elapsed_ms < DELAYED_AFTER_INTERVALS.saturating_mul(interval_ms) {
        ConnectionStatus::Online
    } else if elapsed_ms < OFFLINE_AFTER_INTERVALS.saturating_mul(interval_ms) {
        ConnectionStatus::Delayed
    } else {
        ConnectionStatus::Offline
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::Duration;

    const TEN_MINUTES: i64 = 600_000;

    #[test]
    fn test_never_seen_is_offline() {
        // ---
        let now = Utc::now();
        assert_eq!(classify(None, TEN_MINUTES, now), ConnectionStatus::Offline);
        assert_eq!(classify(None, i64::MAX, now), ConnectionStatus::Offline);
    }

    #[test]
    fn test_classification_bands() {
        // ---
        let now = Utc::now();
        let ago = |ms: i64| Some(now - Duration::milliseconds(ms));

        assert_eq!(classify(ago(1_000), TEN_MINUTES, now), ConnectionStatus::Online);
        assert_eq!(classify(ago(1_500_000), TEN_MINUTES, now), ConnectionStatus::Delayed);
        assert_eq!(classify(ago(4_000_000), TEN_MINUTES, now), ConnectionStatus::Offline);
    }

    #[test]
    fn test_band_edges() {
        // ---
        let now = Utc::now();
        let ago = |ms: i64| Some(now - Duration::milliseconds(ms));

        assert_eq!(classify(ago(1_199_999), TEN_MINUTES, now), ConnectionStatus::Online);
        assert_eq!(classify(ago(1_200_000), TEN_MINUTES, now), ConnectionStatus::Delayed);
        assert_eq!(classify(ago(2_999_999), TEN_MINUTES, now), ConnectionStatus::Delayed);
        assert_eq!(classify(ago(3_000_000), TEN_MINUTES, now), ConnectionStatus::Offline);
    }

    #[test]
    fn test_serializes_lowercase() {
        // ---
        let json = serde_json::to_string(&ConnectionStatus::Delayed).unwrap();
        assert_eq!(json, "\"delayed\"");
    }
}
