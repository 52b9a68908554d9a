//! Telemetry store: durable history in the time-series database.

use crate::error::SensorError;
use crate::models::sensor::{Bucket, BucketAggregate, SensorId, TelemetryReading, TimeWindow};
use crate::stores::timeseries::TimeSeriesStore;

pub fn upsert_reading(store: &dyn TimeSeriesStore, id: SensorId, reading: &TelemetryReading) -> Result<(), SensorError> {
    Ok(store.upsert_reading(id, reading)?)
}

/// Bucketed aggregates over `window`. The caller decides between the cached
/// snapshot and this path; an unbounded window is rejected here.
pub fn query_range(
    store: &dyn TimeSeriesStore,
    id: SensorId,
    window: &TimeWindow,
    bucket: Bucket,
) -> Result<Vec<BucketAggregate>, SensorError> {
    if window.is_unbounded() {
        return Err(SensorError::InvalidArgument(
            "history query needs at least one of from/to".to_string(),
        ));
    }
    Ok(store.aggregate(id, window, bucket)?)
}
