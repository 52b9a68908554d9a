//! In-memory stand-ins for the six stores, used by the orchestration tests.
//!
//! Every adapter records which operations should fail (`fail(op)`), so tests
//! can break a pipeline at any step and inspect what the earlier steps left
//! behind.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::models::sensor::{
    BatteryLevel, Bucket, BucketAggregate, GeoPoint, ProfileDocument, SearchDocument, SensorId, SensorIdentity,
    TelemetryReading, TemperatureStats, TimeWindow, TypeCounter,
};
use crate::stores::Stores;
use crate::stores::cache::CacheStore;
use crate::stores::document::DocumentStore;
use crate::stores::relational::RelationalStore;
use crate::stores::search::SearchStore;
use crate::stores::timeseries::TimeSeriesStore;
use crate::stores::wide_column::WideColumnStore;

#[derive(Default)]
struct Faults(RefCell<BTreeSet<&'static str>>);

impl Faults {
    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.0.borrow().contains(op) {
            Err(StoreError::Unavailable(format!("injected failure: {}", op)))
        } else {
            Ok(())
        }
    }
}

macro_rules! fault_injection {
    ($($t:ty),*) => {$(
        impl $t {
            pub fn fail(&self, op: &'static str) {
                self.faults.0.borrow_mut().insert(op);
            }

            pub fn heal(&self) {
                self.faults.0.borrow_mut().clear();
            }
        }
    )*};
}

#[derive(Default)]
pub struct MemoryRelational {
    faults: Faults,
    next_id: Cell<i64>,
    pub rows: RefCell<BTreeMap<i64, String>>,
}

#[derive(Default)]
pub struct MemoryDocuments {
    faults: Faults,
    pub docs: RefCell<Vec<ProfileDocument>>,
}

#[derive(Default)]
pub struct MemorySearch {
    faults: Faults,
    pub docs: RefCell<Vec<SearchDocument>>,
    /// Every query body received, in order.
    pub queries: RefCell<Vec<Value>>,
}

#[derive(Default)]
pub struct MemoryColumns {
    faults: Faults,
    pub counters: RefCell<BTreeMap<String, i64>>,
    pub temperatures: RefCell<Vec<(i64, f64)>>,
    pub batteries: RefCell<BTreeMap<i64, f64>>,
}

#[derive(Default)]
pub struct MemoryTimeSeries {
    faults: Faults,
    pub rows: RefCell<BTreeMap<(i64, DateTime<Utc>), TelemetryReading>>,
}

#[derive(Default)]
pub struct MemoryCache {
    faults: Faults,
    pub entries: RefCell<BTreeMap<String, String>>,
}

fault_injection!(
    MemoryRelational,
    MemoryDocuments,
    MemorySearch,
    MemoryColumns,
    MemoryTimeSeries,
    MemoryCache
);

/// Owns one of each in-memory store.
#[derive(Default)]
pub struct MemoryStores {
    pub relational: MemoryRelational,
    pub documents: MemoryDocuments,
    pub search: MemorySearch,
    pub columns: MemoryColumns,
    pub timeseries: MemoryTimeSeries,
    pub cache: MemoryCache,
}

impl MemoryStores {
    pub fn stores(&self) -> Stores<'_> {
        Stores {
            relational: &self.relational,
            documents: &self.documents,
            search: &self.search,
            columns: &self.columns,
            timeseries: &self.timeseries,
            cache: &self.cache,
        }
    }
}

impl RelationalStore for MemoryRelational {
    fn find_by_name(&self, name: &str) -> Result<Option<SensorIdentity>, StoreError> {
        self.faults.check("find_by_name")?;
        Ok(self.rows.borrow().iter().find(|(_, n)| n.as_str() == name).map(|(id, n)| SensorIdentity {
            id: SensorId(*id),
            name: n.clone(),
        }))
    }

    fn insert(&self, name: &str) -> Result<SensorIdentity, StoreError> {
        self.faults.check("insert")?;
        if self.rows.borrow().values().any(|n| n == name) {
            return Err(StoreError::UniqueViolation(format!("sensors_name_key: {}", name)));
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.rows.borrow_mut().insert(id, name.to_string());
        Ok(SensorIdentity {
            id: SensorId(id),
            name: name.to_string(),
        })
    }

    fn delete(&self, id: SensorId) -> Result<Option<SensorIdentity>, StoreError> {
        self.faults.check("delete")?;
        Ok(self.rows.borrow_mut().remove(&id.0).map(|name| SensorIdentity { id, name }))
    }

    fn list(&self, offset: i64, limit: i64) -> Result<Vec<SensorIdentity>, StoreError> {
        self.faults.check("list")?;
        Ok(self
            .rows
            .borrow()
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(id, name)| SensorIdentity {
                id: SensorId(*id),
                name: name.clone(),
            })
            .collect())
    }
}

/// Great-circle distance in meters.
fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lat2) = (a.latitude().to_radians(), b.latitude().to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude() - a.longitude()).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

impl DocumentStore for MemoryDocuments {
    fn insert_profile(&self, doc: &ProfileDocument) -> Result<(), StoreError> {
        self.faults.check("insert_profile")?;
        self.docs.borrow_mut().push(doc.clone());
        Ok(())
    }

    fn find_profile(&self, id: SensorId) -> Result<Option<ProfileDocument>, StoreError> {
        self.faults.check("find_profile")?;
        Ok(self.docs.borrow().iter().find(|d| d.id == id.0).cloned())
    }

    fn find_nearest(&self, point: &GeoPoint, max_distance_m: f64) -> Result<Option<ProfileDocument>, StoreError> {
        self.faults.check("find_nearest")?;
        Ok(self
            .docs
            .borrow()
            .iter()
            .map(|d| (haversine_m(point, &d.location), d))
            .filter(|(dist, _)| *dist <= max_distance_m)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, d)| d.clone()))
    }
}

impl SearchStore for MemorySearch {
    fn index_document(&self, _index: &str, doc: &SearchDocument) -> Result<(), StoreError> {
        self.faults.check("index_document")?;
        self.docs.borrow_mut().push(doc.clone());
        Ok(())
    }

    /// Understands the `{"query": {<strategy>: {<field>: <text>}}}` shape and
    /// matches every strategy as a case-insensitive substring.
    fn search(&self, _index: &str, body: &Value) -> Result<Vec<SearchDocument>, StoreError> {
        self.faults.check("search")?;
        self.queries.borrow_mut().push(body.clone());

        let clause = body["query"]
            .as_object()
            .and_then(|q| q.values().next())
            .and_then(Value::as_object)
            .and_then(|c| c.iter().next())
            .ok_or_else(|| StoreError::Query(format!("unsupported query body: {}", body)))?;
        let (field, text) = (clause.0.as_str(), clause.1.as_str().unwrap_or_default().to_lowercase());
        let size = body["size"].as_u64().unwrap_or(10) as usize;

        Ok(self
            .docs
            .borrow()
            .iter()
            .filter(|d| {
                let value = match field {
                    "name" => &d.name,
                    "type" => &d.r#type,
                    _ => &d.description,
                };
                value.to_lowercase().contains(&text)
            })
            .take(size)
            .cloned()
            .collect())
    }
}

impl WideColumnStore for MemoryColumns {
    fn increment_type_counter(&self, sensor_type: &str) -> Result<(), StoreError> {
        self.faults.check("increment_type_counter")?;
        *self.counters.borrow_mut().entry(sensor_type.to_string()).or_default() += 1;
        Ok(())
    }

    fn type_counters(&self) -> Result<Vec<TypeCounter>, StoreError> {
        self.faults.check("type_counters")?;
        Ok(self
            .counters
            .borrow()
            .iter()
            .map(|(t, q)| TypeCounter {
                r#type: t.clone(),
                quantity: *q,
            })
            .collect())
    }

    fn append_temperature(&self, id: SensorId, temperature: f64) -> Result<(), StoreError> {
        self.faults.check("append_temperature")?;
        self.temperatures.borrow_mut().push((id.0, temperature));
        Ok(())
    }

    fn set_battery_level(&self, id: SensorId, level: f64) -> Result<(), StoreError> {
        self.faults.check("set_battery_level")?;
        self.batteries.borrow_mut().insert(id.0, level);
        Ok(())
    }

    fn temperature_stats(&self) -> Result<Vec<TemperatureStats>, StoreError> {
        self.faults.check("temperature_stats")?;
        let mut grouped: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for (id, t) in self.temperatures.borrow().iter() {
            grouped.entry(*id).or_default().push(*t);
        }
        Ok(grouped
            .into_iter()
            .map(|(id, ts)| TemperatureStats {
                id: SensorId(id),
                max_temperature: ts.iter().copied().fold(f64::MIN, f64::max),
                min_temperature: ts.iter().copied().fold(f64::MAX, f64::min),
                average_temperature: ts.iter().sum::<f64>() / ts.len() as f64,
            })
            .collect())
    }

    fn batteries_below(&self, threshold: f64) -> Result<Vec<BatteryLevel>, StoreError> {
        self.faults.check("batteries_below")?;
        Ok(self
            .batteries
            .borrow()
            .iter()
            .filter(|(_, level)| **level < threshold)
            .map(|(id, level)| BatteryLevel {
                id: SensorId(*id),
                battery_level: *level,
            })
            .collect())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn aggregate_rows(id: SensorId, bucket_start: Option<DateTime<Utc>>, rows: &[&TelemetryReading]) -> BucketAggregate {
    BucketAggregate {
        id,
        bucket_start,
        avg_velocity: mean(rows.iter().filter_map(|r| r.velocity)),
        avg_temperature: mean(rows.iter().filter_map(|r| r.temperature)),
        avg_humidity: mean(rows.iter().filter_map(|r| r.humidity)),
        min_battery_level: rows.iter().map(|r| r.battery_level).reduce(f64::min),
    }
}

/// Start of the bucket containing `ts`, aligned the way `time_bucket` aligns
/// them (weeks start on Monday, months and years on the 1st).
fn bucket_start(bucket: Bucket, ts: DateTime<Utc>) -> DateTime<Utc> {
    let day = ts.date_naive();
    let midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));
    match bucket {
        Bucket::Hour => {
            let secs = ts.timestamp() - ts.timestamp().rem_euclid(3600);
            Utc.timestamp_opt(secs, 0).single().unwrap_or(ts)
        }
        Bucket::Day => midnight(day),
        Bucket::Week => midnight(day - Duration::days(day.weekday().num_days_from_monday() as i64)),
        Bucket::Month => midnight(day.with_day(1).unwrap_or(day)),
        Bucket::Year => midnight(day.with_ordinal(1).unwrap_or(day)),
    }
}

/// Inclusive on both ends, like the SQL bounds.
fn in_window(window: &TimeWindow, ts: DateTime<Utc>) -> bool {
    window.from.is_none_or(|from| ts >= from) && window.to.is_none_or(|to| ts <= to)
}

impl TimeSeriesStore for MemoryTimeSeries {
    fn upsert_reading(&self, id: SensorId, reading: &TelemetryReading) -> Result<(), StoreError> {
        self.faults.check("upsert_reading")?;
        self.rows.borrow_mut().insert((id.0, reading.last_seen), reading.clone());
        Ok(())
    }

    fn aggregate(&self, id: SensorId, window: &TimeWindow, bucket: Bucket) -> Result<Vec<BucketAggregate>, StoreError> {
        self.faults.check("aggregate")?;
        if window.is_unbounded() {
            return Err(StoreError::Query("aggregate requires at least one of from/to".to_string()));
        }
        let rows = self.rows.borrow();
        let matching: Vec<&TelemetryReading> = rows
            .iter()
            .filter(|((rid, ts), _)| *rid == id.0 && in_window(window, *ts))
            .map(|(_, r)| r)
            .collect();
        if matching.is_empty() {
            return Ok(Vec::new());
        }
        if window.from.is_none() || window.to.is_none() {
            return Ok(vec![aggregate_rows(id, None, &matching)]);
        }

        let mut buckets: BTreeMap<DateTime<Utc>, Vec<&TelemetryReading>> = BTreeMap::new();
        for r in matching {
            buckets.entry(bucket_start(bucket, r.last_seen)).or_default().push(r);
        }
        Ok(buckets
            .into_iter()
            .map(|(start, rs)| aggregate_rows(id, Some(start), &rs))
            .collect())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.faults.check("get")?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.faults.check("set")?;
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.faults.check("delete")?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.faults.check("clear")?;
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_align_like_time_bucket() {
        // Thursday
        let ts = Utc.with_ymd_and_hms(2024, 3, 14, 17, 42, 9).unwrap();
        assert_eq!(bucket_start(Bucket::Hour, ts), Utc.with_ymd_and_hms(2024, 3, 14, 17, 0, 0).unwrap());
        assert_eq!(bucket_start(Bucket::Day, ts), Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap());
        assert_eq!(bucket_start(Bucket::Week, ts), Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(bucket_start(Bucket::Month, ts), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(bucket_start(Bucket::Year, ts), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let w = TimeWindow { from: Some(from), to: Some(to) };
        assert!(in_window(&w, from));
        assert!(in_window(&w, to));
        assert!(!in_window(&w, to + Duration::seconds(1)));
        assert!(TimeWindow::default().is_unbounded());
    }
}
