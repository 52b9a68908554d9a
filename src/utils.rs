use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;

use crate::error::SensorError;

/// Round to two decimal places, as battery levels are reported.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SensorError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|_| SensorError::InvalidArgument(format!("timestamp {:?} is neither RFC 3339 nor YYYY-MM-DD", raw)))
}

/// Deserialize a JSON payload, reporting the path of the offending field on failure.
pub fn parse_json<T: DeserializeOwned>(what: &str, raw: &str) -> Result<T, SensorError> {
    let de = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(de)
        .map_err(|e| SensorError::InvalidArgument(format!("{} at `{}`: {}", what, e.path(), e.inner())))
}
