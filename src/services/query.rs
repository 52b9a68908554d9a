//! Read paths. The primary store answers first and every row is then enriched
//! with its profile, one lookup at a time.

use log::{debug, error, info, warn};

use crate::error::{SensorError, WriteStep};
use crate::models::sensor::{
    LowBatterySensor, NearbySensor, SensorId, SensorIdentity, SensorProfile, SensorTemperatures, SensorsEnvelope,
    SnapshotView, TelemetryView, TemperatureValues, TimeWindow, TypeCounter,
};
use crate::services::{counters, indexer, profiles, registrar, snapshots, telemetry};
use crate::stores::Stores;
use crate::utils::round2;

pub fn get_sensor(stores: &Stores, id: SensorId) -> Result<SensorProfile, SensorError> {
    profiles::get_profile(stores.documents, id)
}

/// Nearest sensor within `radius_m`, with its latest reading when one is cached.
pub fn get_sensor_near(
    stores: &Stores,
    latitude: f64,
    longitude: f64,
    radius_m: f64,
) -> Result<NearbySensor, SensorError> {
    let profile = profiles::find_near(stores.documents, latitude, longitude, radius_m)?;
    let snapshot = match snapshots::get_snapshot(stores.cache, profile.id) {
        Ok(reading) => Some(reading),
        Err(SensorError::NotFound(_)) => {
            debug!("Near: sensor {} has no cached reading", profile.id);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(NearbySensor {
        temperature: snapshot.as_ref().and_then(|r| r.temperature),
        humidity: snapshot.as_ref().and_then(|r| r.humidity),
        velocity: snapshot.as_ref().and_then(|r| r.velocity),
        battery_level: snapshot.as_ref().map(|r| r.battery_level),
        last_seen: snapshot.as_ref().map(|r| r.last_seen),
        profile,
    })
}

/// Full-text search. Hits are resolved to profiles by name; any hit that
/// cannot be resolved fails the whole request.
pub fn search_sensors(
    stores: &Stores,
    query_body: &str,
    size: usize,
    search_type: &str,
) -> Result<Vec<SensorProfile>, SensorError> {
    let hits = indexer::query(stores.search, query_body, search_type, size)?;
    debug!("Search: {} hit(s) for {} ({})", hits.len(), query_body, search_type);

    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        let identity = registrar::resolve_by_name(stores.relational, &hit.name).inspect_err(|e| {
            warn!("Search: hit {:?} could not be resolved: {}", hit.name, e);
        })?;
        out.push(profiles::get_profile(stores.documents, identity.id)?);
    }
    Ok(out)
}

pub fn temperature_values(stores: &Stores) -> Result<SensorsEnvelope<SensorTemperatures>, SensorError> {
    let stats = counters::temperature_stats(stores.columns)?;
    let mut out = Vec::with_capacity(stats.len());
    for row in stats {
        out.push(SensorTemperatures {
            profile: profiles::get_profile(stores.documents, row.id)?,
            values: vec![TemperatureValues {
                max_temperature: row.max_temperature,
                min_temperature: row.min_temperature,
                average_temperature: row.average_temperature,
            }],
        });
    }
    Ok(out.into())
}

pub fn low_battery_sensors(stores: &Stores) -> Result<SensorsEnvelope<LowBatterySensor>, SensorError> {
    let rows = counters::list_low_battery(stores.columns, counters::LOW_BATTERY_THRESHOLD)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(LowBatterySensor {
            profile: profiles::get_profile(stores.documents, row.id)?,
            battery_level: round2(row.battery_level),
        });
    }
    Ok(out.into())
}

pub fn quantity_by_type(stores: &Stores) -> Result<SensorsEnvelope<TypeCounter>, SensorError> {
    Ok(counters::list_type_counters(stores.columns)?.into())
}

pub fn list_sensors(stores: &Stores) -> Result<Vec<SensorIdentity>, SensorError> {
    registrar::list_identities(stores.relational, 0, registrar::DEFAULT_LIST_LIMIT)
}

/// Latest snapshot when `window` has no bounds, bucketed history otherwise.
/// A bucket is only required (and validated) for the history path.
pub fn get_data(
    stores: &Stores,
    id: SensorId,
    window: &TimeWindow,
    bucket: Option<&str>,
) -> Result<TelemetryView, SensorError> {
    profiles::get_profile(stores.documents, id)?;

    if window.is_unbounded() {
        let reading = snapshots::get_snapshot(stores.cache, id)?;
        return Ok(TelemetryView::Latest(SnapshotView { id, reading }));
    }

    let bucket = bucket
        .ok_or_else(|| SensorError::InvalidArgument("bucket is required when from/to is given".to_string()))?
        .parse()?;
    Ok(TelemetryView::History(telemetry::query_range(stores.timeseries, id, window, bucket)?))
}

/// Removes the identity and the cached snapshot. The profile, search
/// document, counters and history stay behind.
pub fn delete_sensor(stores: &Stores, id: SensorId) -> Result<SensorIdentity, SensorError> {
    let removed = registrar::delete_identity(stores.relational, id)?;
    snapshots::delete(stores.cache, id).map_err(|e| {
        error!("Delete: sensor {} identity removed but {} eviction failed: {}", id, WriteStep::Snapshot, e);
        SensorError::partial_write(WriteStep::Snapshot, id, e)
    })?;
    info!("Delete: sensor {} ({:?}) removed", id, removed.name);
    Ok(removed)
}
