//! MongoDB profile collection (`SensorsDB.Sensors`) with a `2dsphere` index
//! on `location`.

use mongodb::IndexModel;
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::sync::{Client, Collection};

use crate::error::StoreError;
use crate::models::sensor::{GeoPoint, ProfileDocument, SensorId};

const DATABASE: &str = "SensorsDB";
const COLLECTION: &str = "Sensors";

pub trait DocumentStore {
    fn insert_profile(&self, doc: &ProfileDocument) -> Result<(), StoreError>;
    fn find_profile(&self, id: SensorId) -> Result<Option<ProfileDocument>, StoreError>;
    /// Single nearest profile within `max_distance_m` meters of `point`.
    fn find_nearest(&self, point: &GeoPoint, max_distance_m: f64) -> Result<Option<ProfileDocument>, StoreError>;
}

pub struct MongoProfileStore {
    collection: Collection<ProfileDocument>,
}

fn mongo_error(what: &str, e: mongodb::error::Error) -> StoreError {
    match *e.kind {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
            StoreError::Unavailable(format!("{}: {}", what, e))
        }
        ErrorKind::BsonDeserialization(_) => StoreError::Decode(format!("{}: {}", what, e)),
        _ => StoreError::Query(format!("{}: {}", what, e)),
    }
}

impl MongoProfileStore {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(url).map_err(|e| mongo_error("connect to mongodb", e))?;
        let collection = client.database(DATABASE).collection::<ProfileDocument>(COLLECTION);
        collection
            .create_index(IndexModel::builder().keys(doc! { "location": "2dsphere" }).build())
            .run()
            .map_err(|e| mongo_error("create location index", e))?;
        Ok(MongoProfileStore { collection })
    }
}

impl DocumentStore for MongoProfileStore {
    fn insert_profile(&self, doc: &ProfileDocument) -> Result<(), StoreError> {
        self.collection
            .insert_one(doc)
            .run()
            .map(|_| ())
            .map_err(|e| mongo_error("insert profile", e))
    }

    // `_id` is not part of ProfileDocument and is dropped on deserialization.
    fn find_profile(&self, id: SensorId) -> Result<Option<ProfileDocument>, StoreError> {
        self.collection
            .find_one(doc! { "id": id.0 })
            .run()
            .map_err(|e| mongo_error("find profile", e))
    }

    fn find_nearest(&self, point: &GeoPoint, max_distance_m: f64) -> Result<Option<ProfileDocument>, StoreError> {
        let filter = doc! {
            "location": {
                "$near": {
                    "$geometry": { "type": "Point", "coordinates": [point.longitude(), point.latitude()] },
                    "$maxDistance": max_distance_m,
                }
            }
        };
        self.collection
            .find_one(filter)
            .run()
            .map_err(|e| mongo_error("find nearest profile", e))
    }
}
