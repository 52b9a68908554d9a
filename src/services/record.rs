//! Telemetry orchestrator: one reading fans out to the time-series history,
//! the wide-column projections and the snapshot cache, in that order.

use chrono::{DateTime, Utc};
use log::{debug, error};

use crate::error::{SensorError, WriteStep};
use crate::models::sensor::{SensorData, SensorId, SnapshotView};
use crate::services::{counters, profiles, snapshots, telemetry};
use crate::stores::Stores;

pub fn record_reading(stores: &Stores, id: SensorId, data: &SensorData) -> Result<SnapshotView, SensorError> {
    record_reading_at(stores, id, data, Utc::now())
}

/// Same as [`record_reading`] with an explicit clock for readings that carry no `last_seen`.
pub fn record_reading_at(
    stores: &Stores,
    id: SensorId,
    data: &SensorData,
    now: DateTime<Utc>,
) -> Result<SnapshotView, SensorError> {
    profiles::get_profile(stores.documents, id)?;

    let reading = data.stamped(now);
    let partial = |step: WriteStep| {
        move |e: SensorError| {
            error!("Record: sensor {} reading at {} left partial, {} step failed: {}", id, reading.last_seen, step, e);
            SensorError::partial_write(step, id, e)
        }
    };

    telemetry::upsert_reading(stores.timeseries, id, &reading)?;
    debug!("Record: sensor {} history row at {}", id, reading.last_seen);

    if let Some(temperature) = reading.temperature {
        counters::append_temperature_reading(stores.columns, id, temperature)
            .map_err(partial(WriteStep::TemperatureHistory))?;
    }
    counters::set_battery_level(stores.columns, id, reading.battery_level).map_err(partial(WriteStep::BatteryLevel))?;
    snapshots::set_snapshot(stores.cache, id, &reading).map_err(partial(WriteStep::Snapshot))?;
    debug!("Record: sensor {} snapshot updated", id);

    Ok(SnapshotView { id, reading })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::create::create_sensor;
    use crate::services::create::tests::request;
    use crate::stores::memory::MemoryStores;
    use chrono::TimeZone;

    fn data(battery_level: f64, temperature: Option<f64>) -> SensorData {
        SensorData {
            battery_level,
            temperature,
            humidity: Some(48.0),
            velocity: None,
            last_seen: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 10, 15, 0).unwrap()
    }

    #[test]
    fn unknown_sensor_is_rejected_before_any_write() {
        let mem = MemoryStores::default();
        let err = record_reading_at(&mem.stores(), SensorId(42), &data(0.9, Some(20.0)), now()).unwrap_err();
        assert!(matches!(err, SensorError::NotFound(_)));
        assert!(mem.timeseries.rows.borrow().is_empty());
        assert!(mem.cache.entries.borrow().is_empty());
    }

    #[test]
    fn reading_lands_in_every_store_with_one_timestamp() {
        let mem = MemoryStores::default();
        let id = create_sensor(&mem.stores(), &request("s", "Temperatura")).unwrap().id;
        let view = record_reading_at(&mem.stores(), id, &data(0.75, Some(22.5)), now()).unwrap();

        assert_eq!(view.reading.last_seen, now());
        assert!(mem.timeseries.rows.borrow().contains_key(&(id.0, now())));
        assert_eq!(*mem.columns.temperatures.borrow(), vec![(id.0, 22.5)]);
        assert_eq!(mem.columns.batteries.borrow().get(&id.0), Some(&0.75));
        assert_eq!(snapshots::get_snapshot(&mem.cache, id).unwrap(), view.reading);
    }

    #[test]
    fn missing_temperature_skips_history_append() {
        let mem = MemoryStores::default();
        let id = create_sensor(&mem.stores(), &request("s", "Humitat")).unwrap().id;
        record_reading_at(&mem.stores(), id, &data(0.6, None), now()).unwrap();
        assert!(mem.columns.temperatures.borrow().is_empty());
        assert_eq!(mem.columns.batteries.borrow().get(&id.0), Some(&0.6));
    }

    #[test]
    fn history_failure_is_upstream_not_partial() {
        let mem = MemoryStores::default();
        let id = create_sensor(&mem.stores(), &request("s", "Temperatura")).unwrap().id;
        mem.timeseries.fail("upsert_reading");
        let err = record_reading_at(&mem.stores(), id, &data(0.6, Some(19.0)), now()).unwrap_err();
        assert!(matches!(err, SensorError::UpstreamUnavailable(_)));
        assert!(mem.columns.batteries.borrow().is_empty());
    }

    #[test]
    fn later_failures_name_their_step() {
        let cases = [
            ("append_temperature", WriteStep::TemperatureHistory),
            ("set_battery_level", WriteStep::BatteryLevel),
        ];
        for (op, expected) in cases {
            let mem = MemoryStores::default();
            let id = create_sensor(&mem.stores(), &request("s", "Temperatura")).unwrap().id;
            mem.columns.fail(op);
            let err = record_reading_at(&mem.stores(), id, &data(0.6, Some(19.0)), now()).unwrap_err();
            match err {
                SensorError::PartialWrite { step, sensor_id, .. } => {
                    assert_eq!(step, expected);
                    assert_eq!(sensor_id, id);
                }
                other => panic!("{op}: expected partial write, got {other:?}"),
            }
            assert_eq!(mem.timeseries.rows.borrow().len(), 1);
            assert!(mem.cache.entries.borrow().is_empty());
        }
    }

    #[test]
    fn snapshot_failure_keeps_projections() {
        let mem = MemoryStores::default();
        let id = create_sensor(&mem.stores(), &request("s", "Temperatura")).unwrap().id;
        mem.cache.fail("set");
        let err = record_reading_at(&mem.stores(), id, &data(0.4, Some(18.0)), now()).unwrap_err();
        assert!(matches!(err, SensorError::PartialWrite { step: WriteStep::Snapshot, .. }));
        assert_eq!(mem.columns.batteries.borrow().get(&id.0), Some(&0.4));
        assert_eq!(mem.columns.temperatures.borrow().len(), 1);
    }
}
