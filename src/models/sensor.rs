//! Sensor domain types shared by the stores and the orchestrators.
//!
//! Notes
//! - `SensorId` is the cross-store join key; it is allocated by the relational store.
//! - Request/response shapes are plain serde structs; optional telemetry values
//!   stay `Option` end to end so absent values are never written as zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::SensorError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub i64);

impl Display for SensorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =====================
// Identity and profile
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorIdentity {
    pub id: SensorId,
    pub name: String,
}

/// Sensor creation request: every profile field except the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCreate {
    pub name: String,
    pub r#type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub id: SensorId,
    pub name: String,
    pub r#type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// GeoJSON point. Coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub r#type: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            r#type: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }
}

/// Profile as stored in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub id: i64,
    pub name: String,
    pub r#type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub description: String,
    pub location: GeoPoint,
}

impl ProfileDocument {
    pub fn from_request(id: SensorId, req: &SensorCreate) -> Self {
        ProfileDocument {
            id: id.0,
            name: req.name.clone(),
            r#type: req.r#type.clone(),
            mac_address: req.mac_address.clone(),
            manufacturer: req.manufacturer.clone(),
            model: req.model.clone(),
            serial_number: req.serial_number.clone(),
            firmware_version: req.firmware_version.clone(),
            description: req.description.clone(),
            location: GeoPoint::new(req.latitude, req.longitude),
        }
    }
}

impl From<ProfileDocument> for SensorProfile {
    fn from(doc: ProfileDocument) -> Self {
        let latitude = doc.location.latitude();
        let longitude = doc.location.longitude();
        SensorProfile {
            id: SensorId(doc.id),
            name: doc.name,
            r#type: doc.r#type,
            mac_address: doc.mac_address,
            manufacturer: doc.manufacturer,
            model: doc.model,
            serial_number: doc.serial_number,
            firmware_version: doc.firmware_version,
            description: doc.description,
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub name: String,
    pub r#type: String,
    pub description: String,
}

// =====================
// Wide-column projections
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounter {
    pub r#type: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub id: SensorId,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub average_temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryLevel {
    pub id: SensorId,
    pub battery_level: f64,
}

// =====================
// Telemetry
// =====================

/// Telemetry write request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    pub battery_level: f64,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub velocity: Option<f64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl SensorData {
    /// Pin the observation time, falling back to `now` when the sensor did not report one.
    pub fn stamped(&self, now: DateTime<Utc>) -> TelemetryReading {
        TelemetryReading {
            battery_level: self.battery_level,
            temperature: self.temperature,
            humidity: self.humidity,
            velocity: self.velocity,
            last_seen: self.last_seen.unwrap_or(now),
        }
    }
}

/// A reading with a definite timestamp; the unit written to the time-series
/// store and cached as the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub battery_level: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub velocity: Option<f64>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotView {
    pub id: SensorId,
    #[serde(flatten)]
    pub reading: TelemetryReading,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Bucket {
    /// Interval literal accepted by `time_bucket`.
    pub fn interval(&self) -> &'static str {
        match self {
            Bucket::Hour => "1 hour",
            Bucket::Day => "1 day",
            Bucket::Week => "1 week",
            Bucket::Month => "1 month",
            Bucket::Year => "1 year",
        }
    }
}

impl FromStr for Bucket {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Bucket::Hour),
            "day" => Ok(Bucket::Day),
            "week" => Ok(Bucket::Week),
            "month" => Ok(Bucket::Month),
            "year" => Ok(Bucket::Year),
            other => Err(SensorError::InvalidArgument(format!(
                "bucket {:?} is not one of hour, day, week, month, year",
                other
            ))),
        }
    }
}

/// Inclusive time window for history reads; both ends optional.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAggregate {
    pub id: SensorId,
    pub bucket_start: Option<DateTime<Utc>>,
    pub avg_velocity: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub min_battery_level: Option<f64>,
}

/// Telemetry read response: the cached snapshot or bucketed history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryView {
    Latest(SnapshotView),
    History(Vec<BucketAggregate>),
}

// =====================
// Composite read responses
// =====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbySensor {
    #[serde(flatten)]
    pub profile: SensorProfile,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub velocity: Option<f64>,
    pub battery_level: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureValues {
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub average_temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorTemperatures {
    #[serde(flatten)]
    pub profile: SensorProfile,
    pub values: Vec<TemperatureValues>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowBatterySensor {
    #[serde(flatten)]
    pub profile: SensorProfile,
    pub battery_level: f64,
}

/// `{"sensors": [...]}` envelope used by the statistics listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorsEnvelope<T> {
    pub sensors: Vec<T>,
}

impl<T> From<Vec<T>> for SensorsEnvelope<T> {
    fn from(sensors: Vec<T>) -> Self {
        SensorsEnvelope { sensors }
    }
}
