//! Redis-backed key/value cache holding the latest snapshot per sensor.

use redis::Commands;
use std::cell::RefCell;

use crate::error::StoreError;

pub trait CacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

pub struct RedisCache {
    conn: RefCell<redis::Connection>,
}

fn redis_error(what: &str, e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        StoreError::Unavailable(format!("{}: {}", what, e))
    } else {
        StoreError::Query(format!("{}: {}", what, e))
    }
}

impl RedisCache {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| redis_error("open redis client", e))?;
        let conn = client.get_connection().map_err(|e| redis_error("connect to redis", e))?;
        Ok(RedisCache {
            conn: RefCell::new(conn),
        })
    }
}

impl CacheStore for RedisCache {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .borrow_mut()
            .get::<_, Option<String>>(key)
            .map_err(|e| redis_error("GET", e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn
            .borrow_mut()
            .set::<_, _, ()>(key, value)
            .map_err(|e| redis_error("SET", e))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .borrow_mut()
            .del::<_, ()>(key)
            .map_err(|e| redis_error("DEL", e))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.borrow_mut();
        redis::cmd("FLUSHDB")
            .query::<()>(&mut *conn)
            .map_err(|e| redis_error("FLUSHDB", e))
    }
}
