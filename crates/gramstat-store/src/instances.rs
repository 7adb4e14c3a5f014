//! Job manager instance cache.
//!
//! Instances have a composite natural key, but job status packets only
//! carry the instance uuid. The cache therefore keeps a uuid index next to
//! the composite one, and a uuid hit wins over the composite key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::dimension::DimensionCache;
use crate::dimensions::{JobManagerInstanceKey, JobManagerInstances};
use crate::error::StoreResult;

#[derive(Debug, Default)]
pub struct JobManagerInstanceCache {
    by_key: DimensionCache<JobManagerInstances>,
    by_uuid: HashMap<String, i64>,
    pending_uuids: Vec<String>,
}

impl JobManagerInstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.by_key.is_loaded()
    }

    pub fn load_all(&mut self, session: &Connection) -> StoreResult<usize> {
        let loaded = self.by_key.load_all(session)?;
        for (key, id) in self.by_key.iter() {
            self.by_uuid.insert(key.uuid.clone(), id);
        }
        Ok(loaded)
    }

    pub fn get_by_uuid(&self, uuid: &str) -> Option<i64> {
        self.by_uuid.get(uuid).copied()
    }

    /// Resolve an instance whose job manager is known.
    pub fn get_or_create(
        &mut self,
        session: &Connection,
        key: &JobManagerInstanceKey,
    ) -> StoreResult<i64> {
        if let Some(id) = self.by_uuid.get(&key.uuid) {
            return Ok(*id);
        }
        let id = self.by_key.get_or_create(session, key)?;
        self.by_uuid.insert(key.uuid.clone(), id);
        self.pending_uuids.push(key.uuid.clone());
        Ok(id)
    }

    /// Resolve an instance by uuid alone. A new row gets a NULL job manager.
    pub fn get_or_create_by_uuid(
        &mut self,
        session: &Connection,
        uuid: &str,
        start_time: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        if let Some(id) = self.by_uuid.get(uuid) {
            return Ok(*id);
        }
        let key = JobManagerInstanceKey {
            job_manager_id: None,
            uuid: uuid.to_string(),
            start_time,
        };
        self.get_or_create(session, &key)
    }

    pub fn commit(&mut self) {
        self.by_key.commit();
        self.pending_uuids.clear();
    }

    pub fn rollback(&mut self) -> usize {
        for uuid in self.pending_uuids.drain(..) {
            self.by_uuid.remove(&uuid);
        }
        self.by_key.rollback()
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }
}
