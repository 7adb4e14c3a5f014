//! Write-through dimension caches.
//!
//! A [`Dimension`] describes one lookup table: its natural key, how to
//! scan every row, and how to insert a new one. [`DimensionCache`] mirrors
//! such a table in memory. It is filled by a single full scan, grows on
//! every miss, and never evicts.
//!
//! Inserts made while a packet is in flight are journaled. The owner calls
//! [`DimensionCache::commit`] once the packet's rows are durable, or
//! [`DimensionCache::rollback`] after rolling the storage session back, so
//! the cache never keeps an id whose row did not commit.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use rusqlite::{Connection, Row};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// One lookup table keyed by a natural key.
pub trait Dimension {
    /// Value-equality natural key.
    type Key: Clone + Eq + Hash + fmt::Debug;

    /// Backing table name.
    const TABLE: &'static str;

    /// Read every `(key, id)` pair in the table.
    fn scan(session: &Connection) -> StoreResult<Vec<(Self::Key, i64)>>;

    /// Insert a row for `key` and return its generated id.
    fn insert(session: &Connection, key: &Self::Key) -> StoreResult<i64>;
}

/// Run a full-table `SELECT` and map each row to a `(key, id)` pair.
pub(crate) fn scan_rows<K>(
    session: &Connection,
    sql: &str,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<(K, i64)>,
) -> StoreResult<Vec<(K, i64)>> {
    let mut stmt = session.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

/// In-memory mirror of a [`Dimension`] table.
pub struct DimensionCache<D: Dimension> {
    entries: HashMap<D::Key, i64>,
    /// Keys inserted since the last commit/rollback.
    pending: Vec<D::Key>,
    loaded: bool,
    inserted: u64,
    _dimension: PhantomData<D>,
}

impl<D: Dimension> Default for DimensionCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dimension> fmt::Debug for DimensionCache<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionCache")
            .field("table", &D::TABLE)
            .field("entries", &self.entries.len())
            .field("pending", &self.pending.len())
            .field("loaded", &self.loaded)
            .finish()
    }
}

impl<D: Dimension> DimensionCache<D> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            pending: Vec::new(),
            loaded: false,
            inserted: 0,
            _dimension: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        D::TABLE
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Warm the cache with one full scan. A second call is a no-op.
    pub fn load_all(&mut self, session: &Connection) -> StoreResult<usize> {
        if self.loaded {
            return Ok(self.entries.len());
        }
        for (key, id) in D::scan(session)? {
            self.entries.insert(key, id);
        }
        self.loaded = true;
        info!(table = D::TABLE, entries = self.entries.len(), "dimension cache warmed");
        Ok(self.entries.len())
    }

    /// Cached id for `key`, without touching the store.
    pub fn get(&self, key: &D::Key) -> Option<i64> {
        self.entries.get(key).copied()
    }

    /// Return the id for `key`, inserting a row on first sight.
    ///
    /// A failed insert leaves the cache untouched.
    pub fn get_or_create(&mut self, session: &Connection, key: &D::Key) -> StoreResult<i64> {
        if !self.loaded {
            return Err(StoreError::CacheNotLoaded(D::TABLE));
        }
        if let Some(id) = self.entries.get(key) {
            return Ok(*id);
        }
        let id = D::insert(session, key)?;
        debug!(table = D::TABLE, id, ?key, "dimension row created");
        self.entries.insert(key.clone(), id);
        self.pending.push(key.clone());
        self.inserted += 1;
        Ok(id)
    }

    /// Accept every insert made since the last commit/rollback.
    pub fn commit(&mut self) {
        self.pending.clear();
    }

    /// Forget every insert made since the last commit/rollback.
    /// Returns the number of entries dropped.
    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending.len();
        for key in self.pending.drain(..) {
            self.entries.remove(&key);
        }
        self.inserted -= dropped as u64;
        if dropped > 0 {
            debug!(table = D::TABLE, dropped, "uncommitted dimension rows forgotten");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows this cache inserted (and kept) since it was created.
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&D::Key, i64)> {
        self.entries.iter().map(|(key, id)| (key, *id))
    }
}
