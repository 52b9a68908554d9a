//! Cassandra/Scylla keyspace `sensor`: per-type counters, append-only
//! temperature history and the latest battery level per sensor.
//!
//! The driver is async; the adapter owns a current-thread tokio runtime and
//! blocks on each statement so it fits the blocking request path.

use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::deserialize::row::DeserializeRow;
use scylla::response::query_result::QueryResult;
use scylla::serialize::row::SerializeRow;
use scylla::value::Counter;
use tokio::runtime::Runtime;

use crate::error::StoreError;
use crate::models::sensor::{BatteryLevel, SensorId, TemperatureStats, TypeCounter};

pub trait WideColumnStore {
    fn increment_type_counter(&self, sensor_type: &str) -> Result<(), StoreError>;
    fn type_counters(&self) -> Result<Vec<TypeCounter>, StoreError>;
    /// Append one temperature row stamped by the server clock.
    fn append_temperature(&self, id: SensorId, temperature: f64) -> Result<(), StoreError>;
    fn set_battery_level(&self, id: SensorId, level: f64) -> Result<(), StoreError>;
    fn temperature_stats(&self) -> Result<Vec<TemperatureStats>, StoreError>;
    /// Sensors whose latest battery level is strictly below `threshold`.
    fn batteries_below(&self, threshold: f64) -> Result<Vec<BatteryLevel>, StoreError>;
}

const SCHEMA: [&str; 4] = [
    "CREATE KEYSPACE IF NOT EXISTS sensor WITH REPLICATION = { 'class': 'SimpleStrategy', 'replication_factor': 1 }",
    "CREATE TABLE IF NOT EXISTS sensor.temperature (id bigint, last_seen timestamp, temperature double, PRIMARY KEY (id, last_seen))",
    "CREATE TABLE IF NOT EXISTS sensor.quantity (type_sensor text PRIMARY KEY, quantity counter)",
    "CREATE TABLE IF NOT EXISTS sensor.battery (id bigint PRIMARY KEY, battery_level double)",
];

// field order matters: the session must drop before its runtime
pub struct CassandraStore {
    session: Session,
    runtime: Runtime,
}

impl CassandraStore {
    pub fn connect(nodes: &[String]) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Unavailable(format!("tokio runtime: {}", e)))?;
        let session = runtime
            .block_on(SessionBuilder::new().known_nodes(nodes).build())
            .map_err(|e| StoreError::Unavailable(format!("connect to cassandra {:?}: {}", nodes, e)))?;

        let store = CassandraStore { session, runtime };
        for statement in SCHEMA {
            store.execute(statement, ())?;
        }
        Ok(store)
    }

    fn execute(&self, cql: &str, values: impl SerializeRow) -> Result<QueryResult, StoreError> {
        self.runtime
            .block_on(self.session.query_unpaged(cql, values))
            .map_err(|e| StoreError::Query(format!("{}: {}", cql, e)))
    }

    fn rows<R>(&self, cql: &str, values: impl SerializeRow) -> Result<Vec<R>, StoreError>
    where
        R: for<'frame, 'metadata> DeserializeRow<'frame, 'metadata>,
    {
        let decode = |e: &dyn std::fmt::Display| StoreError::Decode(format!("{}: {}", cql, e));
        let result = self.execute(cql, values)?.into_rows_result().map_err(|e| decode(&e))?;
        let rows = result.rows::<R>().map_err(|e| decode(&e))?;
        rows.collect::<Result<Vec<R>, _>>().map_err(|e| decode(&e))
    }
}

impl WideColumnStore for CassandraStore {
    fn increment_type_counter(&self, sensor_type: &str) -> Result<(), StoreError> {
        self.execute(
            "UPDATE sensor.quantity SET quantity = quantity + 1 WHERE type_sensor = ?",
            (sensor_type,),
        )
        .map(|_| ())
    }

    fn type_counters(&self) -> Result<Vec<TypeCounter>, StoreError> {
        let rows: Vec<(String, Counter)> = self.rows("SELECT type_sensor, quantity FROM sensor.quantity", ())?;
        Ok(rows
            .into_iter()
            .map(|(r#type, quantity)| TypeCounter {
                r#type,
                quantity: quantity.0,
            })
            .collect())
    }

    fn append_temperature(&self, id: SensorId, temperature: f64) -> Result<(), StoreError> {
        self.execute(
            "INSERT INTO sensor.temperature (id, last_seen, temperature) VALUES (?, toTimestamp(now()), ?)",
            (id.0, temperature),
        )
        .map(|_| ())
    }

    fn set_battery_level(&self, id: SensorId, level: f64) -> Result<(), StoreError> {
        self.execute(
            "UPDATE sensor.battery SET battery_level = ? WHERE id = ?",
            (level, id.0),
        )
        .map(|_| ())
    }

    fn temperature_stats(&self) -> Result<Vec<TemperatureStats>, StoreError> {
        let rows: Vec<(i64, f64, f64, f64)> = self.rows(
            "SELECT id, MAX(temperature), MIN(temperature), AVG(temperature) FROM sensor.temperature GROUP BY id",
            (),
        )?;
        Ok(rows
            .into_iter()
            .map(|(id, max, min, avg)| TemperatureStats {
                id: SensorId(id),
                max_temperature: max,
                min_temperature: min,
                average_temperature: avg,
            })
            .collect())
    }

    fn batteries_below(&self, threshold: f64) -> Result<Vec<BatteryLevel>, StoreError> {
        let rows: Vec<(i64, f64)> = self.rows(
            "SELECT id, battery_level FROM sensor.battery WHERE battery_level < ? ALLOW FILTERING",
            (threshold,),
        )?;
        Ok(rows
            .into_iter()
            .map(|(id, battery_level)| BatteryLevel {
                id: SensorId(id),
                battery_level,
            })
            .collect())
    }
}
