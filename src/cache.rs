//! Memoization collaborator for generated schemas.
//!
//! The schema generator consults a [`SchemaCache`] before reflecting a class. A
//! cache failure is never fatal: callers log it and carry on as on a miss.

use crate::error::Result;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub trait SchemaCache {
    fn get(&mut self, key: &str) -> Result<Option<Value>>;

    /// Store `value`; `ttl` of `None` keeps it until cleared
    fn put(&mut self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

/// Process-local cache with per-entry expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (Value, Option<Instant>)>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL applied by [`MemoryCache::put`] when the caller passes none
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaCache for MemoryCache {
    fn get(&mut self, key: &str) -> Result<Option<Value>> {
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some((_, Some(expires_at))) => Instant::now() >= *expires_at,
            Some((_, None)) => false,
        };

        if expired {
            debug!("Cache entry {} expired", key);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|(value, _)| value.clone()))
    }

    fn put(&mut self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl);
        self.entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}
