//! Durable telemetry history on a TimescaleDB hypertable (`sensor_data`).

use diesel::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Timestamptz};
use diesel::upsert::excluded;
use std::cell::RefCell;

use crate::db::models::{BucketRow, NewSensorReading};
use crate::error::StoreError;
use crate::models::sensor::{Bucket, BucketAggregate, SensorId, TelemetryReading, TimeWindow};
use crate::schema;
use crate::stores::diesel_error;

pub trait TimeSeriesStore {
    /// Insert-or-update keyed by `(id, last_seen)`; on conflict every value
    /// column is overwritten, absent optionals included.
    fn upsert_reading(&self, id: SensorId, reading: &TelemetryReading) -> Result<(), StoreError>;
    /// Aggregate readings inside `window`. Rows are grouped per bucket when
    /// both bounds are set, otherwise a single flat aggregate per sensor is
    /// returned with no `bucket_start`.
    fn aggregate(&self, id: SensorId, window: &TimeWindow, bucket: Bucket) -> Result<Vec<BucketAggregate>, StoreError>;
}

pub struct TimescaleStore {
    conn: RefCell<PgConnection>,
}

impl TimescaleStore {
    pub fn new(conn: PgConnection) -> Self {
        TimescaleStore {
            conn: RefCell::new(conn),
        }
    }
}

const AGGREGATES: &str = "AVG(velocity) AS avg_velocity, AVG(temperature) AS avg_temperature, \
                          AVG(humidity) AS avg_humidity, MIN(battery_level) AS min_battery_level";

impl TimeSeriesStore for TimescaleStore {
    fn upsert_reading(&self, id: SensorId, reading: &TelemetryReading) -> Result<(), StoreError> {
        use schema::sensor_data::dsl as D;

        let row = NewSensorReading::new(id, reading);
        let mut conn = self.conn.borrow_mut();
        diesel::insert_into(D::sensor_data)
            .values(&row)
            .on_conflict((D::id, D::last_seen))
            .do_update()
            .set((
                D::battery_level.eq(excluded(D::battery_level)),
                D::temperature.eq(excluded(D::temperature)),
                D::humidity.eq(excluded(D::humidity)),
                D::velocity.eq(excluded(D::velocity)),
            ))
            .execute(&mut *conn)
            .map(|_| ())
            .map_err(|e| diesel_error("upsert sensor reading", e))
    }

    fn aggregate(&self, id: SensorId, window: &TimeWindow, bucket: Bucket) -> Result<Vec<BucketAggregate>, StoreError> {
        let mut conn = self.conn.borrow_mut();
        // interval() is a fixed literal; caller input is only ever bound, never formatted in.
        let rows: Vec<BucketRow> = match (window.from, window.to) {
            (Some(from), Some(to)) => diesel::sql_query(format!(
                "SELECT id, time_bucket('{interval}', last_seen) AS bucket_start, {AGGREGATES} \
                 FROM sensor_data WHERE id = $1 AND last_seen >= $2 AND last_seen <= $3 \
                 GROUP BY id, bucket_start ORDER BY bucket_start",
                interval = bucket.interval()
            ))
            .bind::<BigInt, _>(id.0)
            .bind::<Timestamptz, _>(from)
            .bind::<Timestamptz, _>(to)
            .load::<BucketRow>(&mut *conn),
            (Some(from), None) => diesel::sql_query(format!(
                "SELECT id, NULL::timestamptz AS bucket_start, {AGGREGATES} \
                 FROM sensor_data WHERE id = $1 AND last_seen >= $2 GROUP BY id"
            ))
            .bind::<BigInt, _>(id.0)
            .bind::<Timestamptz, _>(from)
            .load::<BucketRow>(&mut *conn),
            (None, Some(to)) => diesel::sql_query(format!(
                "SELECT id, NULL::timestamptz AS bucket_start, {AGGREGATES} \
                 FROM sensor_data WHERE id = $1 AND last_seen <= $2 GROUP BY id"
            ))
            .bind::<BigInt, _>(id.0)
            .bind::<Timestamptz, _>(to)
            .load::<BucketRow>(&mut *conn),
            (None, None) => {
                return Err(StoreError::Query(
                    "aggregate requires at least one of from/to".to_string(),
                ));
            }
        }
        .map_err(|e| diesel_error("aggregate sensor readings", e))?;

        Ok(rows.into_iter().map(BucketAggregate::from).collect())
    }
}
