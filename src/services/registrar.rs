//! Identity registrar: allocates and looks up sensor identities in the
//! relational store.

use log::warn;

use crate::error::{SensorError, StoreError};
use crate::models::sensor::{SensorId, SensorIdentity};
use crate::stores::relational::RelationalStore;

pub const DEFAULT_LIST_LIMIT: i64 = 100;

pub fn check_name_exists(store: &dyn RelationalStore, name: &str) -> Result<bool, SensorError> {
    Ok(store.find_by_name(name)?.is_some())
}

/// Insert a new identity. The unique index on `name` is the authoritative
/// conflict signal; it catches callers that raced past `check_name_exists`.
pub fn create_identity(store: &dyn RelationalStore, name: &str) -> Result<SensorId, SensorError> {
    match store.insert(name) {
        Ok(identity) => Ok(identity.id),
        Err(StoreError::UniqueViolation(detail)) => {
            warn!("Registrar: insert for {:?} lost a uniqueness race ({})", name, detail);
            Err(SensorError::Conflict(format!("sensor with name {:?} already registered", name)))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn resolve_by_name(store: &dyn RelationalStore, name: &str) -> Result<SensorIdentity, SensorError> {
    store
        .find_by_name(name)?
        .ok_or_else(|| SensorError::NotFound(format!("sensor named {:?}", name)))
}

pub fn delete_identity(store: &dyn RelationalStore, id: SensorId) -> Result<SensorIdentity, SensorError> {
    store
        .delete(id)?
        .ok_or_else(|| SensorError::NotFound(format!("sensor {}", id)))
}

pub fn list_identities(store: &dyn RelationalStore, offset: i64, limit: i64) -> Result<Vec<SensorIdentity>, SensorError> {
    Ok(store.list(offset, limit)?)
}
