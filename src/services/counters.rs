//! Counter and latest-value projections in the wide-column store.

use crate::error::SensorError;
use crate::models::sensor::{BatteryLevel, SensorId, TemperatureStats, TypeCounter};
use crate::stores::wide_column::WideColumnStore;

/// Battery levels strictly below this fraction are reported as low.
pub const LOW_BATTERY_THRESHOLD: f64 = 0.2;

pub fn increment_type_counter(store: &dyn WideColumnStore, sensor_type: &str) -> Result<(), SensorError> {
    Ok(store.increment_type_counter(sensor_type)?)
}

pub fn list_type_counters(store: &dyn WideColumnStore) -> Result<Vec<TypeCounter>, SensorError> {
    Ok(store.type_counters()?)
}

pub fn append_temperature_reading(store: &dyn WideColumnStore, id: SensorId, temperature: f64) -> Result<(), SensorError> {
    Ok(store.append_temperature(id, temperature)?)
}

pub fn set_battery_level(store: &dyn WideColumnStore, id: SensorId, level: f64) -> Result<(), SensorError> {
    Ok(store.set_battery_level(id, level)?)
}

pub fn temperature_stats(store: &dyn WideColumnStore) -> Result<Vec<TemperatureStats>, SensorError> {
    Ok(store.temperature_stats()?)
}

pub fn list_low_battery(store: &dyn WideColumnStore, threshold: f64) -> Result<Vec<BatteryLevel>, SensorError> {
    Ok(store.batteries_below(threshold)?)
}
