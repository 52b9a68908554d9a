//! Profile manager over the document store.

use crate::error::SensorError;
use crate::models::sensor::{GeoPoint, ProfileDocument, SensorCreate, SensorId, SensorProfile};
use crate::stores::document::DocumentStore;

pub fn create_profile(store: &dyn DocumentStore, id: SensorId, req: &SensorCreate) -> Result<(), SensorError> {
    Ok(store.insert_profile(&ProfileDocument::from_request(id, req))?)
}

pub fn get_profile(store: &dyn DocumentStore, id: SensorId) -> Result<SensorProfile, SensorError> {
    store
        .find_profile(id)?
        .map(SensorProfile::from)
        .ok_or_else(|| SensorError::NotFound(format!("sensor {}", id)))
}

/// Nearest profile within `radius_m` meters; only the single closest match is returned.
pub fn find_near(
    store: &dyn DocumentStore,
    latitude: f64,
    longitude: f64,
    radius_m: f64,
) -> Result<SensorProfile, SensorError> {
    store
        .find_nearest(&GeoPoint::new(latitude, longitude), radius_m)?
        .map(SensorProfile::from)
        .ok_or_else(|| {
            SensorError::NotFound(format!(
                "no sensor within {}m of ({}, {})",
                radius_m, latitude, longitude
            ))
        })
}
