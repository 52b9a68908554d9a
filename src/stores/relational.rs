//! Relational identity store (PostgreSQL via diesel). Owns `id` allocation and
//! name uniqueness.

use diesel::PgConnection;
use diesel::prelude::*;
use std::cell::RefCell;

use crate::db::models as dbm;
use crate::error::StoreError;
use crate::models::sensor::{SensorId, SensorIdentity};
use crate::schema;
use crate::stores::diesel_error;

pub trait RelationalStore {
    fn find_by_name(&self, name: &str) -> Result<Option<SensorIdentity>, StoreError>;
    /// Insert a new identity; a duplicate name yields `StoreError::UniqueViolation`.
    fn insert(&self, name: &str) -> Result<SensorIdentity, StoreError>;
    /// Delete and return the removed record, `None` when absent.
    fn delete(&self, id: SensorId) -> Result<Option<SensorIdentity>, StoreError>;
    fn list(&self, offset: i64, limit: i64) -> Result<Vec<SensorIdentity>, StoreError>;
}

pub struct PgIdentityStore {
    conn: RefCell<PgConnection>,
}

impl PgIdentityStore {
    /// Wrap an established connection; migrations are expected to be applied.
    pub fn new(conn: PgConnection) -> Self {
        PgIdentityStore {
            conn: RefCell::new(conn),
        }
    }
}

impl RelationalStore for PgIdentityStore {
    fn find_by_name(&self, name: &str) -> Result<Option<SensorIdentity>, StoreError> {
        use schema::sensors::dsl as S;

        let mut conn = self.conn.borrow_mut();
        S::sensors
            .filter(S::name.eq(name))
            .select(dbm::Sensor::as_select())
            .first(&mut *conn)
            .optional()
            .map(|row| row.map(SensorIdentity::from))
            .map_err(|e| diesel_error("fetch sensor by name", e))
    }

    fn insert(&self, name: &str) -> Result<SensorIdentity, StoreError> {
        use schema::sensors::dsl as S;

        let mut conn = self.conn.borrow_mut();
        diesel::insert_into(S::sensors)
            .values(&dbm::NewSensor { name })
            .returning(dbm::Sensor::as_returning())
            .get_result(&mut *conn)
            .map(SensorIdentity::from)
            .map_err(|e| diesel_error("insert sensor", e))
    }

    fn delete(&self, id: SensorId) -> Result<Option<SensorIdentity>, StoreError> {
        use schema::sensors::dsl as S;

        let mut conn = self.conn.borrow_mut();
        diesel::delete(S::sensors.filter(S::id.eq(id.0)))
            .returning(dbm::Sensor::as_returning())
            .get_result(&mut *conn)
            .optional()
            .map(|row| row.map(SensorIdentity::from))
            .map_err(|e| diesel_error("delete sensor", e))
    }

    fn list(&self, offset: i64, limit: i64) -> Result<Vec<SensorIdentity>, StoreError> {
        use schema::sensors::dsl as S;

        let mut conn = self.conn.borrow_mut();
        let rows: Vec<dbm::Sensor> = S::sensors
            .order(S::id.asc())
            .offset(offset)
            .limit(limit)
            .select(dbm::Sensor::as_select())
            .load(&mut *conn)
            .map_err(|e| diesel_error("list sensors", e))?;
        Ok(rows.into_iter().map(SensorIdentity::from).collect())
    }
}
