//! UsageStore — SQLite connection owner for the usage schema.
//!
//! Opens (or creates) the database, makes sure every table exists, and
//! hands out the connection that ingest uses as its storage session. The
//! in-memory backend is for tests.

use std::path::Path;

use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::dimensions::RslAttributes;
use crate::error::{StoreError, StoreResult};
use crate::schema::ensure_schema;
use crate::tables;

pub struct UsageStore {
    conn: Connection,
}

impl UsageStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::Open(e.to_string()))?;
        ensure_schema(&conn)?;
        debug!(?path, "usage store opened");
        Ok(Self { conn })
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
        ensure_schema(&conn)?;
        debug!("in-memory usage store opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Register the standard RSL attributes with `id = position`, so bit
    /// `n` of a job manager's base bitfield decodes to `names[n]`.
    ///
    /// Names or positions already taken are left alone. Returns how many
    /// rows were added. At most [`RslAttributes::FIRST_EXTENSION_ID`]
    /// names fit below the extension ids.
    pub fn seed_rsl_attributes(&mut self, names: &[String]) -> StoreResult<usize> {
        if names.len() as i64 > RslAttributes::FIRST_EXTENSION_ID {
            return Err(StoreError::InvalidValue {
                table: tables::RSL_ATTRIBUTES,
                column: "id",
                value: format!("{} standard attributes", names.len()),
            });
        }
        let tx = self.conn.transaction()?;
        let mut added = 0;
        for (position, name) in names.iter().enumerate() {
            added += tx.execute(
                "INSERT OR IGNORE INTO gram5_rsl_attributes(id, attribute, extension)
                 VALUES (?1, ?2, ?3)",
                params![position as i64, name, false],
            )?;
        }
        tx.commit()?;
        if added > 0 {
            info!(
                table = tables::RSL_ATTRIBUTES,
                added,
                total = names.len(),
                "standard rsl attributes seeded"
            );
        }
        Ok(added)
    }

    /// Number of rows in one of the usage tables.
    pub fn row_count(&self, table: &str) -> StoreResult<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }
}
