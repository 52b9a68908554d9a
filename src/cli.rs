//! Command-line surface: argument parsing and dispatch onto the orchestrators.

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{SensorError, StoreError};
use crate::models::sensor::{SensorCreate, SensorData, SensorId, TimeWindow};
use crate::services::{create, query, record, seed, snapshots};
use crate::stores::Stores;
use crate::utils::{parse_json, parse_timestamp};

pub const USAGE: &str = "\
usage: senser [--env-file PATH] <command> [args]
  list | get ID | create JSON | delete ID
  near LAT LON RADIUS | search QUERY_JSON [SIZE] [SEARCH_TYPE]
  temperature-values | quantity-by-type | low-battery
  record ID JSON | data ID [--from TS] [--to TS] [--bucket B]
  flush-cache | seed COUNT";

const DEFAULT_SEARCH_SIZE: usize = 10;
const DEFAULT_SEARCH_TYPE: &str = "match";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Get(SensorId),
    Create(SensorCreate),
    Delete(SensorId),
    Near {
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    },
    Search {
        query: String,
        size: usize,
        search_type: String,
    },
    TemperatureValues,
    QuantityByType,
    LowBattery,
    Record(SensorId, SensorData),
    Data {
        id: SensorId,
        window: TimeWindow,
        bucket: Option<String>,
    },
    FlushCache,
    Seed(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub env_file: Option<PathBuf>,
    pub command: Command,
}

fn usage_error(msg: impl Into<String>) -> String {
    format!("{}\n{}", msg.into(), USAGE)
}

fn number<T: std::str::FromStr>(what: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| usage_error(format!("{} must be a number, got {:?}", what, raw)))
}

/// Parse everything after the program name.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Invocation, String> {
    let mut env_file = None;
    let mut rest = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--env-file" {
            let path = args.next().ok_or_else(|| usage_error("`--env-file` requires a path argument"))?;
            env_file = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--env-file=") {
            if path.is_empty() {
                return Err(usage_error("`--env-file` requires a path argument"));
            }
            env_file = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }

    let (name, params) = rest.split_first().ok_or_else(|| usage_error("missing command"))?;
    let params: Vec<&str> = params.iter().map(String::as_str).collect();
    let arity = |min: usize, max: usize| {
        if params.len() < min || params.len() > max {
            Err(usage_error(format!("`{}` takes {}..={} argument(s), got {}", name, min, max, params.len())))
        } else {
            Ok(())
        }
    };
    let id = |raw: &str| number::<i64>("sensor id", raw).map(SensorId);
    let payload_error = |e: SensorError| usage_error(e.to_string());

    let command = match name.as_str() {
        "list" => arity(0, 0).map(|_| Command::List)?,
        "get" => {
            arity(1, 1)?;
            Command::Get(id(params[0])?)
        }
        "create" => {
            arity(1, 1)?;
            Command::Create(parse_json("sensor", params[0]).map_err(payload_error)?)
        }
        "delete" => {
            arity(1, 1)?;
            Command::Delete(id(params[0])?)
        }
        "near" => {
            arity(3, 3)?;
            Command::Near {
                latitude: number("latitude", params[0])?,
                longitude: number("longitude", params[1])?,
                radius_m: number("radius", params[2])?,
            }
        }
        "search" => {
            arity(1, 3)?;
            Command::Search {
                query: params[0].to_string(),
                size: params.get(1).map(|s| number("size", s)).transpose()?.unwrap_or(DEFAULT_SEARCH_SIZE),
                search_type: params.get(2).unwrap_or(&DEFAULT_SEARCH_TYPE).to_string(),
            }
        }
        "temperature-values" => arity(0, 0).map(|_| Command::TemperatureValues)?,
        "quantity-by-type" => arity(0, 0).map(|_| Command::QuantityByType)?,
        "low-battery" => arity(0, 0).map(|_| Command::LowBattery)?,
        "record" => {
            arity(2, 2)?;
            Command::Record(id(params[0])?, parse_json("telemetry", params[1]).map_err(payload_error)?)
        }
        "data" => {
            arity(1, 7)?;
            parse_data(id(params[0])?, &params[1..])?
        }
        "flush-cache" => arity(0, 0).map(|_| Command::FlushCache)?,
        "seed" => {
            arity(1, 1)?;
            Command::Seed(number("count", params[0])?)
        }
        other => return Err(usage_error(format!("unknown command {:?}", other))),
    };

    Ok(Invocation { env_file, command })
}

fn parse_data(id: SensorId, flags: &[&str]) -> Result<Command, String> {
    let mut window = TimeWindow::default();
    let mut bucket = None;
    let mut flags = flags.iter();
    while let Some(flag) = flags.next() {
        let value = flags
            .next()
            .ok_or_else(|| usage_error(format!("`{}` requires a value", flag)))?;
        match *flag {
            "--from" => window.from = Some(parse_timestamp(value).map_err(|e| usage_error(e.to_string()))?),
            "--to" => window.to = Some(parse_timestamp(value).map_err(|e| usage_error(e.to_string()))?),
            "--bucket" => bucket = Some(value.to_string()),
            other => return Err(usage_error(format!("unknown flag {:?} for `data`", other))),
        }
    }
    Ok(Command::Data { id, window, bucket })
}

fn to_json<T: Serialize>(value: T) -> Result<Value, SensorError> {
    serde_json::to_value(value)
        .map_err(|e| SensorError::UpstreamUnavailable(StoreError::Decode(format!("serialize response: {}", e))))
}

/// Run one command against `stores` and return the JSON response body.
pub fn dispatch(stores: &Stores, command: Command) -> Result<Value, SensorError> {
    match command {
        Command::List => to_json(query::list_sensors(stores)?),
        Command::Get(id) => to_json(query::get_sensor(stores, id)?),
        Command::Create(req) => to_json(create::create_sensor(stores, &req)?),
        Command::Delete(id) => to_json(query::delete_sensor(stores, id)?),
        Command::Near {
            latitude,
            longitude,
            radius_m,
        } => to_json(query::get_sensor_near(stores, latitude, longitude, radius_m)?),
        Command::Search {
            query: body,
            size,
            search_type,
        } => to_json(query::search_sensors(stores, &body, size, &search_type)?),
        Command::TemperatureValues => to_json(query::temperature_values(stores)?),
        Command::QuantityByType => to_json(query::quantity_by_type(stores)?),
        Command::LowBattery => to_json(query::low_battery_sensors(stores)?),
        Command::Record(id, data) => to_json(record::record_reading(stores, id, &data)?),
        Command::Data { id, window, bucket } => to_json(query::get_data(stores, id, &window, bucket.as_deref())?),
        Command::FlushCache => {
            snapshots::clear_all(stores.cache)?;
            Ok(serde_json::json!({ "flushed": true }))
        }
        Command::Seed(count) => {
            let summary = seed::run(stores, count)?;
            Ok(serde_json::json!({
                "sensors": summary.sensors,
                "skipped": summary.skipped,
                "readings": summary.readings,
            }))
        }
    }
}
