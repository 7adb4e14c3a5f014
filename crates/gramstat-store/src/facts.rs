//! Fact rows.
//!
//! Facts are append-only. Field order in each struct matches the column
//! order of its INSERT statement.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rusqlite::{Connection, params};

use crate::error::StoreResult;
use crate::tables;

/// A row appended to a fact table.
pub trait FactRow {
    const TABLE: &'static str;

    fn insert(&self, session: &Connection) -> StoreResult<()>;
}

/// `gram5_job_manager_status`. Counters are NULL when the packet omits them.
#[derive(Debug, Clone, PartialEq)]
pub struct JobManagerStatusRow {
    pub job_manager_instance_id: Option<i64>,
    pub restarted_jobs: Option<i64>,
    pub status_time: DateTime<Utc>,
    /// `send_time - start_time`, e.g. `"3600.000000 seconds"`.
    pub lifetime: String,
    pub total_jobs: Option<i64>,
    pub total_failed: Option<i64>,
    pub total_canceled: Option<i64>,
    pub total_done: Option<i64>,
    pub total_dry_run: Option<i64>,
    pub peak_jobs: Option<i64>,
    pub current_jobs: Option<i64>,
    pub unsubmitted: Option<i64>,
    pub stage_in: Option<i64>,
    pub pending: Option<i64>,
    pub active: Option<i64>,
    pub stage_out: Option<i64>,
    pub failed: Option<i64>,
    pub done: Option<i64>,
}

impl FactRow for JobManagerStatusRow {
    const TABLE: &'static str = tables::JOB_MANAGER_STATUS;

    fn insert(&self, session: &Connection) -> StoreResult<()> {
        session.execute(
            "INSERT INTO gram5_job_manager_status(
                job_manager_instance_id, restarted_jobs, status_time, lifetime,
                total_jobs, total_failed, total_canceled, total_done, total_dry_run,
                peak_jobs, current_jobs, unsubmitted, stage_in, pending, active,
                stage_out, failed, done)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                self.job_manager_instance_id,
                self.restarted_jobs,
                self.status_time,
                self.lifetime,
                self.total_jobs,
                self.total_failed,
                self.total_canceled,
                self.total_done,
                self.total_dry_run,
                self.peak_jobs,
                self.current_jobs,
                self.unsubmitted,
                self.stage_in,
                self.pending,
                self.active,
                self.stage_out,
                self.failed,
                self.done,
            ],
        )?;
        Ok(())
    }
}

/// `gram5_jobs`: one row per job, referenced by its status row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    /// Job manager *instance* id; the column name predates instances.
    pub job_manager_id: Option<i64>,
    pub send_time: DateTime<Utc>,
    pub count: i64,
    pub host_count: i64,
    pub dryrun: bool,
    pub client_id: Option<i64>,
    pub executable_id: Option<i64>,
    pub rsl_bitfield: BigUint,
    pub jobtype: Option<i64>,
    pub gram5_job_file_info: Option<i64>,
}

impl JobRow {
    /// Insert and return the generated job id.
    pub fn insert(&self, session: &Connection) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO gram5_jobs(
                job_manager_id, send_time, count, host_count, dryrun,
                client_id, executable_id, rsl_bitfield, jobtype, gram5_job_file_info)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                self.job_manager_id,
                self.send_time,
                self.count,
                self.host_count,
                self.dryrun,
                self.client_id,
                self.executable_id,
                self.rsl_bitfield.to_string(),
                self.jobtype,
                self.gram5_job_file_info,
            ],
        )?;
        Ok(session.last_insert_rowid())
    }
}

/// `gram5_job_status`. Stage timestamps are NULL for stages never reached.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusRow {
    pub job_id: i64,
    pub send_time: DateTime<Utc>,
    pub unsubmitted_timestamp: Option<DateTime<Utc>>,
    pub file_stage_in_timestamp: Option<DateTime<Utc>>,
    pub pending_timestamp: Option<DateTime<Utc>>,
    pub active_timestamp: Option<DateTime<Utc>>,
    pub failed_timestamp: Option<DateTime<Utc>>,
    pub file_stage_out_timestamp: Option<DateTime<Utc>>,
    pub done_timestamp: Option<DateTime<Utc>>,
    pub status_count: i64,
    pub register_count: i64,
    pub unregister_count: i64,
    pub signal_count: i64,
    pub refresh_count: i64,
    pub failure_code: i64,
    pub restart_count: i64,
    pub callback_count: i64,
}

impl FactRow for JobStatusRow {
    const TABLE: &'static str = tables::JOB_STATUS;

    fn insert(&self, session: &Connection) -> StoreResult<()> {
        session.execute(
            "INSERT INTO gram5_job_status(
                job_id, send_time,
                unsubmitted_timestamp, file_stage_in_timestamp, pending_timestamp,
                active_timestamp, failed_timestamp, file_stage_out_timestamp, done_timestamp,
                status_count, register_count, unregister_count, signal_count,
                refresh_count, failure_code, restart_count, callback_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                self.job_id,
                self.send_time,
                self.unsubmitted_timestamp,
                self.file_stage_in_timestamp,
                self.pending_timestamp,
                self.active_timestamp,
                self.failed_timestamp,
                self.file_stage_out_timestamp,
                self.done_timestamp,
                self.status_count,
                self.register_count,
                self.unregister_count,
                self.signal_count,
                self.refresh_count,
                self.failure_code,
                self.restart_count,
                self.callback_count,
            ],
        )?;
        Ok(())
    }
}
