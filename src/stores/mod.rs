//! Store adapters: one capability trait per backing store plus its concrete
//! implementation. The orchestrators only ever see the traits, bundled in
//! [`Stores`].
//!
//! Each adapter holds a single blocking connection; `&self` methods borrow it
//! through a `RefCell`, so a `Stores` bundle is meant for one request handler
//! at a time.

pub mod cache;
pub mod document;
pub mod relational;
pub mod search;
pub mod timeseries;
pub mod wide_column;

#[cfg(test)]
pub mod memory;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::StoreError;
use cache::CacheStore;
use document::DocumentStore;
use relational::RelationalStore;
use search::SearchStore;
use timeseries::TimeSeriesStore;
use wide_column::WideColumnStore;

#[derive(Clone, Copy)]
pub struct Stores<'a> {
    pub relational: &'a dyn RelationalStore,
    pub documents: &'a dyn DocumentStore,
    pub search: &'a dyn SearchStore,
    pub columns: &'a dyn WideColumnStore,
    pub timeseries: &'a dyn TimeSeriesStore,
    pub cache: &'a dyn CacheStore,
}

/// Map a diesel failure onto the adapter error taxonomy.
pub(crate) fn diesel_error(what: &str, e: DieselError) -> StoreError {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::UniqueViolation(format!("{}: {}", what, info.message()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info)
        | DieselError::DatabaseError(DatabaseErrorKind::UnableToSendCommand, info) => {
            StoreError::Unavailable(format!("{}: {}", what, info.message()))
        }
        DieselError::DeserializationError(e) => StoreError::Decode(format!("{}: {}", what, e)),
        other => StoreError::Query(format!("{}: {}", what, other)),
    }
}
