//! Registry of RSL attribute groups.
//!
//! Every distinct bitfield seen in a job packet is stored once in
//! `gram5_rsl_attribute_groups` together with its sorted attribute names.
//! Bitfields grow with every extension attribute ever registered, so they
//! are arbitrary-precision integers stored as decimal text.

use std::collections::HashSet;

use num_bigint::BigUint;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::tables;

#[derive(Debug, Default)]
pub struct BitfieldRegistry {
    seen: HashSet<BigUint>,
    pending: Vec<BigUint>,
    loaded: bool,
}

impl BitfieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load_all(&mut self, session: &Connection) -> StoreResult<usize> {
        if self.loaded {
            return Ok(self.seen.len());
        }
        let mut stmt = session.prepare("SELECT bitfield FROM gram5_rsl_attribute_groups")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for text in rows {
            let text = text?;
            let bitfield = text
                .parse::<BigUint>()
                .map_err(|_| StoreError::InvalidValue {
                    table: tables::RSL_ATTRIBUTE_GROUPS,
                    column: "bitfield",
                    value: text.clone(),
                })?;
            self.seen.insert(bitfield);
        }
        self.loaded = true;
        info!(
            table = tables::RSL_ATTRIBUTE_GROUPS,
            entries = self.seen.len(),
            "bitfield registry warmed"
        );
        Ok(self.seen.len())
    }

    pub fn contains(&self, bitfield: &BigUint) -> bool {
        self.seen.contains(bitfield)
    }

    /// Persist `(bitfield, names)` unless the bitfield is already known.
    /// `names` must already be sorted. Returns whether a row was written.
    pub fn register(
        &mut self,
        session: &Connection,
        bitfield: &BigUint,
        names: &[String],
    ) -> StoreResult<bool> {
        if !self.loaded {
            return Err(StoreError::CacheNotLoaded(tables::RSL_ATTRIBUTE_GROUPS));
        }
        if self.seen.contains(bitfield) {
            return Ok(false);
        }
        session.execute(
            "INSERT INTO gram5_rsl_attribute_groups(bitfield, attributes) VALUES (?1, ?2)",
            params![bitfield.to_string(), names.join(",")],
        )?;
        debug!(%bitfield, attributes = names.len(), "rsl attribute group registered");
        self.seen.insert(bitfield.clone());
        self.pending.push(bitfield.clone());
        Ok(true)
    }

    pub fn commit(&mut self) {
        self.pending.clear();
    }

    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending.len();
        for bitfield in self.pending.drain(..) {
            self.seen.remove(&bitfield);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
