//! Error taxonomy shared by the store adapters and the orchestrators.

use core::fmt;
use http::StatusCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::models::sensor::SensorId;

/// Failure reported by a store adapter.
#[derive(Debug)]
pub enum StoreError {
    /// Connection, transport or timeout failure.
    Unavailable(String),
    /// The store rejected or failed the operation.
    Query(String),
    /// The store answered with a payload we could not map.
    Decode(String),
    /// Insert hit a uniqueness constraint.
    UniqueViolation(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(s) => write!(f, "store unavailable: {}", s),
            StoreError::Query(s) => write!(f, "store query failed: {}", s),
            StoreError::Decode(s) => write!(f, "store response undecodable: {}", s),
            StoreError::UniqueViolation(s) => write!(f, "unique constraint violated: {}", s),
        }
    }
}

impl Error for StoreError {}

/// Write-path step that failed after an earlier step already committed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteStep {
    Profile,
    SearchIndex,
    TypeCounter,
    TemperatureHistory,
    BatteryLevel,
    Snapshot,
}

impl Display for WriteStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteStep::Profile => "profile",
            WriteStep::SearchIndex => "search index",
            WriteStep::TypeCounter => "type counter",
            WriteStep::TemperatureHistory => "temperature history",
            WriteStep::BatteryLevel => "battery level",
            WriteStep::Snapshot => "snapshot cache",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum SensorError {
    /// Sensor id/name absent in the store being queried.
    NotFound(String),
    /// Name already registered.
    Conflict(String),
    InvalidArgument(String),
    UpstreamUnavailable(StoreError),
    /// A later step of a multi-store write failed; earlier steps stay applied.
    PartialWrite {
        step: WriteStep,
        sensor_id: SensorId,
        source: Box<SensorError>,
    },
}

impl SensorError {
    pub fn partial_write(step: WriteStep, sensor_id: SensorId, source: SensorError) -> Self {
        SensorError::PartialWrite {
            step,
            sensor_id,
            source: Box::new(source),
        }
    }

    /// Status exposed to callers. Partial writes are indistinguishable from
    /// plain upstream failures at this level.
    pub fn status(&self) -> StatusCode {
        match self {
            SensorError::NotFound(_) => StatusCode::NOT_FOUND,
            SensorError::Conflict(_) => StatusCode::CONFLICT,
            SensorError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            SensorError::UpstreamUnavailable(_) | SensorError::PartialWrite { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl Display for SensorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NotFound(what) => write!(f, "not found: {}", what),
            SensorError::Conflict(what) => write!(f, "conflict: {}", what),
            SensorError::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            SensorError::UpstreamUnavailable(e) => write!(f, "upstream error: {}", e),
            SensorError::PartialWrite {
                step,
                sensor_id,
                source,
            } => write!(f, "sensor {} partially written, {} step failed: {}", sensor_id, step, source),
        }
    }
}

impl Error for SensorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SensorError::UpstreamUnavailable(e) => Some(e),
            SensorError::PartialWrite { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for SensorError {
    fn from(value: StoreError) -> Self {
        SensorError::UpstreamUnavailable(value)
    }
}
