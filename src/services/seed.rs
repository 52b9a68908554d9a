//! Synthetic sensors and readings for local stacks. Everything goes through
//! the orchestrators, so a seeded deployment looks like a real one.

use chrono::{DateTime, Duration, Timelike, Utc};
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::error::SensorError;
use crate::models::sensor::{SensorCreate, SensorData, SensorId};
use crate::services::{create, record};
use crate::stores::Stores;

const SENSOR_TYPES: [&str; 3] = ["Temperatura", "Humitat", "Velocitat"];
const READINGS_PER_SENSOR: i64 = 24;
const STEP_MINUTES: i64 = 60;
// Barcelona
const CENTER: (f64, f64) = (41.3851, 2.1734);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub sensors: usize,
    pub skipped: usize,
    pub readings: usize,
}

pub fn run(stores: &Stores, count: usize) -> Result<SeedSummary, SensorError> {
    run_seeded(stores, count, 0x5E45_0000_CAFE_F00Du64, Utc::now())
}

pub fn run_seeded(stores: &Stores, count: usize, seed: u64, now: DateTime<Utc>) -> Result<SeedSummary, SensorError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut summary = SeedSummary::default();
    let start = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now)
        - Duration::minutes(STEP_MINUTES * READINGS_PER_SENSOR);

    for n in 0..count {
        let sensor_type = SENSOR_TYPES[n % SENSOR_TYPES.len()];
        let req = sensor_request(n, sensor_type, &mut rng);
        let id = match create::create_sensor(stores, &req) {
            Ok(profile) => profile.id,
            Err(SensorError::Conflict(_)) => {
                warn!("Seed: {:?} already exists, skipping", req.name);
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        summary.sensors += 1;

        let mut battery: f64 = rng.random_range(0.1..=1.0);
        for step in 0..READINGS_PER_SENSOR {
            let at = start + Duration::minutes(STEP_MINUTES * step);
            battery = (battery - rng.random_range(0.0..=0.01)).max(0.0);
            let data = synthetic_reading(sensor_type, at, battery, &mut rng);
            record::record_reading(stores, id, &data)?;
            summary.readings += 1;
        }
        log_progress(n + 1, count, id);
    }

    info!(
        "Seed: created {} sensor(s), skipped {}, recorded {} reading(s)",
        summary.sensors, summary.skipped, summary.readings
    );
    Ok(summary)
}

fn log_progress(done: usize, total: usize, last: SensorId) {
    if done % 10 == 0 || done == total {
        info!("Seed: {}/{} sensors processed (last id {})", done, total, last);
    }
}

fn sensor_request(n: usize, sensor_type: &str, rng: &mut SmallRng) -> SensorCreate {
    let serial: u64 = rng.random_range(0..10_000_000_000_000_000);
    SensorCreate {
        name: format!("Sensor {} {}", sensor_type, n + 1),
        r#type: sensor_type.to_string(),
        mac_address: (0..6)
            .map(|_| format!("{:02X}", rng.random_range(0..=255u8)))
            .collect::<Vec<_>>()
            .join(":"),
        manufacturer: "Dummy".to_string(),
        model: format!("Dummy {}", sensor_type),
        serial_number: format!("{:016}", serial),
        firmware_version: format!("1.{}", rng.random_range(0..10)),
        description: format!("Synthetic {} sensor #{}", sensor_type.to_lowercase(), n + 1),
        latitude: CENTER.0 + rng.random_range(-0.05..=0.05),
        longitude: CENTER.1 + rng.random_range(-0.05..=0.05),
    }
}

fn synthetic_reading(sensor_type: &str, at: DateTime<Utc>, battery: f64, rng: &mut SmallRng) -> SensorData {
    let day_fraction = (at.hour() as f64 * 60.0 + at.minute() as f64) / (24.0 * 60.0);
    let diurnal = ((day_fraction - 0.3) * 2.0 * PI).sin();
    let (temperature, humidity, velocity) = match sensor_type {
        "Temperatura" => (Some(18.0 + diurnal * 6.0 + rng.random_range(-1.0..=1.0)), None, None),
        "Humitat" => (None, Some((55.0 - diurnal * 15.0 + rng.random_range(-4.0..=4.0)).clamp(0.0, 100.0)), None),
        _ => (None, None, Some(rng.random_range(0.0..=40.0))),
    };
    SensorData {
        battery_level: battery,
        temperature,
        humidity,
        velocity,
        last_seen: Some(at),
    }
}
