//! Creation orchestrator.
//!
//! `NameCheck → IdentityCreated → ProfileCreated → Indexed → CounterIncremented → Done`
//!
//! Each step runs only after the previous one succeeded. Nothing is rolled
//! back: a failure after the identity insert leaves an orphaned identity and
//! is reported as a partial write naming the failed step.

use log::{debug, error, info, warn};

use crate::error::{SensorError, WriteStep};
use crate::models::sensor::{SensorCreate, SensorId, SensorProfile};
use crate::services::{counters, indexer, profiles, registrar};
use crate::stores::Stores;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CreationState {
    NameCheck,
    IdentityCreated,
    ProfileCreated,
    Indexed,
    CounterIncremented,
    Done,
}

impl CreationState {
    /// Step that moves the pipeline out of this state, if it can leave partial state behind.
    fn pending_step(self) -> Option<WriteStep> {
        match self {
            CreationState::IdentityCreated => Some(WriteStep::Profile),
            CreationState::ProfileCreated => Some(WriteStep::SearchIndex),
            CreationState::Indexed => Some(WriteStep::TypeCounter),
            _ => None,
        }
    }
}

struct Pipeline {
    state: CreationState,
    sensor_id: Option<SensorId>,
}

impl Pipeline {
    fn advance(&mut self, next: CreationState) {
        debug!("Create: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&self, e: SensorError) -> SensorError {
        match (self.state.pending_step(), self.sensor_id) {
            (Some(step), Some(id)) => {
                error!(
                    "Create: sensor {} orphaned, {} step failed after identity insert: {}",
                    id, step, e
                );
                SensorError::partial_write(step, id, e)
            }
            _ => e,
        }
    }
}

pub fn create_sensor(stores: &Stores, req: &SensorCreate) -> Result<SensorProfile, SensorError> {
    let mut p = Pipeline {
        state: CreationState::NameCheck,
        sensor_id: None,
    };

    if registrar::check_name_exists(stores.relational, &req.name)? {
        warn!("Create: rejected duplicate sensor name {:?}", req.name);
        return Err(SensorError::Conflict(format!(
            "sensor with name {:?} already registered",
            req.name
        )));
    }

    let id = registrar::create_identity(stores.relational, &req.name)?;
    p.sensor_id = Some(id);
    p.advance(CreationState::IdentityCreated);

    profiles::create_profile(stores.documents, id, req).map_err(|e| p.fail(e))?;
    p.advance(CreationState::ProfileCreated);

    indexer::index_sensor(stores.search, &req.name, &req.r#type, &req.description).map_err(|e| p.fail(e))?;
    p.advance(CreationState::Indexed);

    counters::increment_type_counter(stores.columns, &req.r#type).map_err(|e| p.fail(e))?;
    p.advance(CreationState::CounterIncremented);

    p.advance(CreationState::Done);
    info!("Create: sensor {} ({:?}, type {:?}) registered", id, req.name, req.r#type);

    Ok(SensorProfile {
        id,
        name: req.name.clone(),
        r#type: req.r#type.clone(),
        mac_address: req.mac_address.clone(),
        manufacturer: req.manufacturer.clone(),
        model: req.model.clone(),
        serial_number: req.serial_number.clone(),
        firmware_version: req.firmware_version.clone(),
        description: req.description.clone(),
        latitude: req.latitude,
        longitude: req.longitude,
    })
}
