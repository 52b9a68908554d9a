//! Snapshot cache: latest reading per sensor, stored as JSON under the sensor id.

use crate::error::{SensorError, StoreError};
use crate::models::sensor::{SensorId, TelemetryReading};
use crate::stores::cache::CacheStore;

fn key(id: SensorId) -> String {
    id.0.to_string()
}

pub fn set_snapshot(store: &dyn CacheStore, id: SensorId, reading: &TelemetryReading) -> Result<(), SensorError> {
    let payload = serde_json::to_string(reading)
        .map_err(|e| StoreError::Decode(format!("serialize snapshot for sensor {}: {}", id, e)))?;
    Ok(store.set(&key(id), &payload)?)
}

pub fn get_snapshot(store: &dyn CacheStore, id: SensorId) -> Result<TelemetryReading, SensorError> {
    let raw = store
        .get(&key(id))?
        .ok_or_else(|| SensorError::NotFound(format!("no cached reading for sensor {}", id)))?;
    let reading = serde_json::from_str(&raw)
        .map_err(|e| StoreError::Decode(format!("cached snapshot for sensor {}: {}", id, e)))?;
    Ok(reading)
}

pub fn delete(store: &dyn CacheStore, id: SensorId) -> Result<(), SensorError> {
    Ok(store.delete(&key(id))?)
}

pub fn clear_all(store: &dyn CacheStore) -> Result<(), SensorError> {
    Ok(store.clear()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryCache;
    use chrono::{TimeZone, Utc};

    #[test]
    fn snapshot_is_overwritten_not_appended() {
        let cache = MemoryCache::default();
        let mut reading = TelemetryReading {
            battery_level: 0.9,
            temperature: Some(20.0),
            humidity: None,
            velocity: None,
            last_seen: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        };
        set_snapshot(&cache, SensorId(1), &reading).unwrap();
        reading.battery_level = 0.85;
        reading.temperature = None;
        set_snapshot(&cache, SensorId(1), &reading).unwrap();

        assert_eq!(get_snapshot(&cache, SensorId(1)).unwrap(), reading);
        assert_eq!(cache.entries.borrow().len(), 1);
    }

    #[test]
    fn delete_and_clear_evict_entries() {
        let cache = MemoryCache::default();
        let reading = TelemetryReading {
            battery_level: 0.5,
            temperature: None,
            humidity: None,
            velocity: Some(3.0),
            last_seen: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        };
        set_snapshot(&cache, SensorId(1), &reading).unwrap();
        set_snapshot(&cache, SensorId(2), &reading).unwrap();

        delete(&cache, SensorId(1)).unwrap();
        assert!(matches!(get_snapshot(&cache, SensorId(1)), Err(SensorError::NotFound(_))));
        clear_all(&cache).unwrap();
        assert!(cache.entries.borrow().is_empty());
    }
}
