//! The GRAM5 dimension tables.
//!
//! Each unit struct implements [`Dimension`] for one table; the key types
//! are the natural keys packets resolve through.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, params_from_iter};

use crate::dimension::{Dimension, scan_rows};
use crate::error::{StoreError, StoreResult};
use crate::tables;

// ── Versions ───────────────────────────────────────────────────────

/// Parsed job manager version.
///
/// `dirt_timestamp` stays an epoch integer here; it only becomes a
/// timestamp column value on insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey {
    pub major: i64,
    pub minor: i64,
    pub flavor: String,
    pub dirt_timestamp: i64,
    pub dirt_branch: i64,
    pub distro_string: Option<String>,
}

pub struct Versions;

impl Dimension for Versions {
    type Key = VersionKey;
    const TABLE: &'static str = tables::VERSIONS;

    fn scan(session: &Connection) -> StoreResult<Vec<(VersionKey, i64)>> {
        scan_rows(
            session,
            "SELECT id, major, minor, flavor, dirt_timestamp, dirt_branch, distro_string
             FROM gram5_versions",
            |row| {
                let dirt: DateTime<Utc> = row.get(4)?;
                let key = VersionKey {
                    major: row.get(1)?,
                    minor: row.get(2)?,
                    flavor: row.get(3)?,
                    dirt_timestamp: dirt.timestamp(),
                    dirt_branch: row.get(5)?,
                    distro_string: row.get(6)?,
                };
                Ok((key, row.get(0)?))
            },
        )
    }

    fn insert(session: &Connection, key: &VersionKey) -> StoreResult<i64> {
        let dirt = DateTime::<Utc>::from_timestamp(key.dirt_timestamp, 0).ok_or_else(|| {
            StoreError::InvalidValue {
                table: tables::VERSIONS,
                column: "dirt_timestamp",
                value: key.dirt_timestamp.to_string(),
            }
        })?;
        session.execute(
            "INSERT INTO gram5_versions(
                major, minor, flavor, dirt_timestamp, dirt_branch, distro_string)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.major,
                key.minor,
                key.flavor,
                dirt,
                key.dirt_branch,
                key.distro_string
            ],
        )?;
        Ok(session.last_insert_rowid())
    }
}

// ── Local resource managers ────────────────────────────────────────

pub struct Lrms;

impl Dimension for Lrms {
    type Key = String;
    const TABLE: &'static str = tables::LRMS;

    fn scan(session: &Connection) -> StoreResult<Vec<(String, i64)>> {
        scan_rows(session, "SELECT id, lrm FROM gram5_lrms", |row| {
            Ok((row.get(1)?, row.get(0)?))
        })
    }

    fn insert(session: &Connection, lrm: &String) -> StoreResult<i64> {
        session.execute("INSERT INTO gram5_lrms(lrm) VALUES (?1)", params![lrm])?;
        Ok(session.last_insert_rowid())
    }
}

// ── Job managers ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobManagerKey {
    pub host_id: Option<i64>,
    pub version_id: Option<i64>,
    pub lrm_id: Option<i64>,
    pub seg_used: bool,
    pub poll_used: bool,
    pub audit_used: bool,
}

pub struct JobManagers;

impl Dimension for JobManagers {
    type Key = JobManagerKey;
    const TABLE: &'static str = tables::JOB_MANAGERS;

    fn scan(session: &Connection) -> StoreResult<Vec<(JobManagerKey, i64)>> {
        scan_rows(
            session,
            "SELECT id, host_id, version, lrm_id, seg_used, poll_used, audit_used
             FROM gram5_job_managers",
            |row| {
                let key = JobManagerKey {
                    host_id: row.get(1)?,
                    version_id: row.get(2)?,
                    lrm_id: row.get(3)?,
                    seg_used: row.get(4)?,
                    poll_used: row.get(5)?,
                    audit_used: row.get(6)?,
                };
                Ok((key, row.get(0)?))
            },
        )
    }

    fn insert(session: &Connection, key: &JobManagerKey) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO gram5_job_managers(
                host_id, version, lrm_id, seg_used, poll_used, audit_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.host_id,
                key.version_id,
                key.lrm_id,
                key.seg_used,
                key.poll_used,
                key.audit_used
            ],
        )?;
        Ok(session.last_insert_rowid())
    }
}

// ── Job manager instances ──────────────────────────────────────────

/// `job_manager_id` is `None` when the instance was first seen through a
/// job status packet, which does not identify its job manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobManagerInstanceKey {
    pub job_manager_id: Option<i64>,
    pub uuid: String,
    pub start_time: Option<DateTime<Utc>>,
}

pub struct JobManagerInstances;

impl Dimension for JobManagerInstances {
    type Key = JobManagerInstanceKey;
    const TABLE: &'static str = tables::JOB_MANAGER_INSTANCES;

    fn scan(session: &Connection) -> StoreResult<Vec<(JobManagerInstanceKey, i64)>> {
        let rows = scan_rows(
            session,
            "SELECT id, job_manager_id, uuid, start_time
             FROM gram5_job_manager_instances",
            |row| {
                let uuid: Option<String> = row.get(2)?;
                let key = match uuid {
                    Some(uuid) => Some(JobManagerInstanceKey {
                        job_manager_id: row.get(1)?,
                        uuid,
                        start_time: row.get(3)?,
                    }),
                    None => None,
                };
                Ok((key, row.get(0)?))
            },
        )?;
        // Rows without a uuid can never be looked up again.
        Ok(rows
            .into_iter()
            .filter_map(|(key, id)| key.map(|key| (key, id)))
            .collect())
    }

    fn insert(session: &Connection, key: &JobManagerInstanceKey) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO gram5_job_manager_instances(job_manager_id, uuid, start_time)
             VALUES (?1, ?2, ?3)",
            params![key.job_manager_id, key.uuid, key.start_time],
        )?;
        Ok(session.last_insert_rowid())
    }
}

// ── Clients ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub host_id: Option<i64>,
    pub dn: Option<String>,
}

pub struct Clients;

impl Dimension for Clients {
    type Key = ClientKey;
    const TABLE: &'static str = tables::CLIENTS;

    fn scan(session: &Connection) -> StoreResult<Vec<(ClientKey, i64)>> {
        scan_rows(session, "SELECT id, host_id, dn FROM gram5_client", |row| {
            let key = ClientKey {
                host_id: row.get(1)?,
                dn: row.get(2)?,
            };
            Ok((key, row.get(0)?))
        })
    }

    fn insert(session: &Connection, key: &ClientKey) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO gram5_client(host_id, dn) VALUES (?1, ?2)",
            params![key.host_id, key.dn],
        )?;
        Ok(session.last_insert_rowid())
    }
}

// ── Executables ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutableKey {
    pub path: String,
    pub arguments: Option<String>,
}

pub struct Executables;

impl Dimension for Executables {
    type Key = ExecutableKey;
    const TABLE: &'static str = tables::EXECUTABLES;

    fn scan(session: &Connection) -> StoreResult<Vec<(ExecutableKey, i64)>> {
        scan_rows(
            session,
            "SELECT id, executable, arguments FROM gram5_executable",
            |row| {
                let key = ExecutableKey {
                    path: row.get(1)?,
                    arguments: row.get(2)?,
                };
                Ok((key, row.get(0)?))
            },
        )
    }

    fn insert(session: &Connection, key: &ExecutableKey) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO gram5_executable(executable, arguments) VALUES (?1, ?2)",
            params![key.path, key.arguments],
        )?;
        Ok(session.last_insert_rowid())
    }
}

// ── Job types ──────────────────────────────────────────────────────

pub struct JobTypes;

impl Dimension for JobTypes {
    type Key = String;
    const TABLE: &'static str = tables::JOB_TYPES;

    fn scan(session: &Connection) -> StoreResult<Vec<(String, i64)>> {
        scan_rows(session, "SELECT id, jobtype FROM gram5_job_types", |row| {
            Ok((row.get(1)?, row.get(0)?))
        })
    }

    fn insert(session: &Connection, jobtype: &String) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO gram5_job_types(jobtype) VALUES (?1)",
            params![jobtype],
        )?;
        Ok(session.last_insert_rowid())
    }
}

// ── RSL attributes ─────────────────────────────────────────────────

/// Attribute name → id. The id doubles as the attribute's bit position.
pub struct RslAttributes;

impl RslAttributes {
    /// Bits below this id belong to the job manager's standard-attribute
    /// bitfield. Extensions are numbered from here up so they never share
    /// a bit with a standard attribute, seeded or not.
    pub const FIRST_EXTENSION_ID: i64 = 64;
}

impl Dimension for RslAttributes {
    type Key = String;
    const TABLE: &'static str = tables::RSL_ATTRIBUTES;

    fn scan(session: &Connection) -> StoreResult<Vec<(String, i64)>> {
        scan_rows(
            session,
            "SELECT id, attribute FROM gram5_rsl_attributes",
            |row| Ok((row.get(1)?, row.get(0)?)),
        )
    }

    /// Attributes discovered from packets are always extensions; the
    /// standard ones are seeded up front.
    fn insert(session: &Connection, attribute: &String) -> StoreResult<i64> {
        let next: i64 = session.query_row(
            "SELECT COALESCE(MAX(id) + 1, 0) FROM gram5_rsl_attributes",
            [],
            |row| row.get(0),
        )?;
        let id = next.max(Self::FIRST_EXTENSION_ID);
        session.execute(
            "INSERT INTO gram5_rsl_attributes(id, attribute, extension) VALUES (?1, ?2, ?3)",
            params![id, attribute, true],
        )?;
        Ok(id)
    }
}

// ── File staging info ──────────────────────────────────────────────

/// File staging protocol usage for one job, in column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileStagingKey {
    pub counts: [i64; 13],
}

impl FileStagingKey {
    pub const COLUMNS: [&'static str; 13] = [
        "file_clean_up",
        "file_stage_in_http",
        "file_stage_in_https",
        "file_stage_in_ftp",
        "file_stage_in_gsiftp",
        "file_stage_in_shared_http",
        "file_stage_in_shared_https",
        "file_stage_in_shared_ftp",
        "file_stage_in_shared_gsiftp",
        "file_stage_out_http",
        "file_stage_out_https",
        "file_stage_out_ftp",
        "file_stage_out_gsiftp",
    ];

    /// No staging activity at all; such jobs get no row.
    pub fn is_trivial(&self) -> bool {
        self.counts.iter().all(|count| *count == 0)
    }
}

pub struct FileStagingInfos;

impl Dimension for FileStagingInfos {
    type Key = FileStagingKey;
    const TABLE: &'static str = tables::JOB_FILE_INFO;

    fn scan(session: &Connection) -> StoreResult<Vec<(FileStagingKey, i64)>> {
        let sql = format!(
            "SELECT id, {} FROM gram5_job_file_info",
            FileStagingKey::COLUMNS.join(", ")
        );
        scan_rows(session, &sql, |row| {
            let mut key = FileStagingKey::default();
            for (i, count) in key.counts.iter_mut().enumerate() {
                *count = row.get(i + 1)?;
            }
            Ok((key, row.get(0)?))
        })
    }

    fn insert(session: &Connection, key: &FileStagingKey) -> StoreResult<i64> {
        let placeholders = (1..=key.counts.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO gram5_job_file_info({}) VALUES ({placeholders})",
            FileStagingKey::COLUMNS.join(", ")
        );
        session.execute(&sql, params_from_iter(key.counts.iter()))?;
        Ok(session.last_insert_rowid())
    }
}
