//! Diesel row structs for the relational identity table and the
//! `sensor_data` hypertable.
//!
//! Domain types live in `crate::models::sensor`; conversions happen here so
//! the store adapters stay free of mapping code.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Timestamptz};

use crate::models::sensor::{BucketAggregate, SensorId, SensorIdentity, TelemetryReading};
use crate::schema;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::sensors)]
pub struct Sensor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::sensors)]
pub struct NewSensor<'a> {
    pub name: &'a str,
}

impl From<Sensor> for SensorIdentity {
    fn from(row: Sensor) -> Self {
        SensorIdentity {
            id: SensorId(row.id),
            name: row.name,
        }
    }
}

// Hypertable: sensor_data
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::sensor_data)]
pub struct NewSensorReading {
    pub id: i64,
    pub last_seen: DateTime<Utc>,
    pub battery_level: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub velocity: Option<f64>,
}

impl NewSensorReading {
    pub fn new(id: SensorId, reading: &TelemetryReading) -> Self {
        Self {
            id: id.0,
            last_seen: reading.last_seen,
            battery_level: reading.battery_level,
            temperature: reading.temperature,
            humidity: reading.humidity,
            velocity: reading.velocity,
        }
    }
}

/// One row of a `time_bucket` aggregate. `bucket_start` is NULL for flat
/// aggregates over a half-open window.
#[derive(Debug, Clone, QueryableByName)]
pub struct BucketRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub bucket_start: Option<DateTime<Utc>>,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_velocity: Option<f64>,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_temperature: Option<f64>,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_humidity: Option<f64>,
    #[diesel(sql_type = Nullable<Double>)]
    pub min_battery_level: Option<f64>,
}

impl From<BucketRow> for BucketAggregate {
    fn from(row: BucketRow) -> Self {
        BucketAggregate {
            id: SensorId(row.id),
            bucket_start: row.bucket_start,
            avg_velocity: row.avg_velocity,
            avg_temperature: row.avg_temperature,
            avg_humidity: row.avg_humidity,
            min_battery_level: row.min_battery_level,
        }
    }
}
