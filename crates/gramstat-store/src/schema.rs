//! SQLite DDL for the usage store.
//!
//! Natural keys carry UNIQUE constraints so a second ingesting process
//! racing on a first insert fails loudly instead of duplicating a
//! dimension row. SQLite treats NULLs as distinct, so keys with NULL
//! components are only protected by the single-writer rule.

use rusqlite::Connection;

use crate::error::StoreResult;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS dns_cache (
    id INTEGER PRIMARY KEY,
    ip_address TEXT NOT NULL,
    hostname TEXT,
    UNIQUE (ip_address, hostname)
);

CREATE TABLE IF NOT EXISTS gram5_versions (
    id INTEGER PRIMARY KEY,
    major INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    flavor TEXT NOT NULL,
    dirt_timestamp TEXT NOT NULL,
    dirt_branch INTEGER NOT NULL,
    distro_string TEXT,
    UNIQUE (major, minor, flavor, dirt_timestamp, dirt_branch, distro_string)
);

CREATE TABLE IF NOT EXISTS gram5_lrms (
    id INTEGER PRIMARY KEY,
    lrm TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS gram5_job_managers (
    id INTEGER PRIMARY KEY,
    host_id INTEGER,
    version INTEGER REFERENCES gram5_versions(id),
    lrm_id INTEGER REFERENCES gram5_lrms(id),
    seg_used BOOLEAN NOT NULL,
    poll_used BOOLEAN NOT NULL,
    audit_used BOOLEAN NOT NULL,
    UNIQUE (host_id, version, lrm_id, seg_used, poll_used, audit_used)
);

CREATE TABLE IF NOT EXISTS gram5_job_manager_instances (
    id INTEGER PRIMARY KEY,
    job_manager_id INTEGER REFERENCES gram5_job_managers(id),
    uuid TEXT UNIQUE,
    start_time TEXT
);

CREATE TABLE IF NOT EXISTS gram5_rsl_attributes (
    id INTEGER PRIMARY KEY,
    attribute TEXT NOT NULL UNIQUE,
    extension BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS gram5_rsl_attribute_groups (
    bitfield TEXT PRIMARY KEY,
    attributes TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gram5_job_types (
    id INTEGER PRIMARY KEY,
    jobtype TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS gram5_client (
    id INTEGER PRIMARY KEY,
    host_id INTEGER,
    dn TEXT,
    UNIQUE (host_id, dn)
);

CREATE TABLE IF NOT EXISTS gram5_executable (
    id INTEGER PRIMARY KEY,
    executable TEXT NOT NULL,
    arguments TEXT,
    UNIQUE (executable, arguments)
);

CREATE TABLE IF NOT EXISTS gram5_job_file_info (
    id INTEGER PRIMARY KEY,
    file_clean_up INTEGER NOT NULL DEFAULT 0,
    file_stage_in_http INTEGER NOT NULL DEFAULT 0,
    file_stage_in_https INTEGER NOT NULL DEFAULT 0,
    file_stage_in_ftp INTEGER NOT NULL DEFAULT 0,
    file_stage_in_gsiftp INTEGER NOT NULL DEFAULT 0,
    file_stage_in_shared_http INTEGER NOT NULL DEFAULT 0,
    file_stage_in_shared_https INTEGER NOT NULL DEFAULT 0,
    file_stage_in_shared_ftp INTEGER NOT NULL DEFAULT 0,
    file_stage_in_shared_gsiftp INTEGER NOT NULL DEFAULT 0,
    file_stage_out_http INTEGER NOT NULL DEFAULT 0,
    file_stage_out_https INTEGER NOT NULL DEFAULT 0,
    file_stage_out_ftp INTEGER NOT NULL DEFAULT 0,
    file_stage_out_gsiftp INTEGER NOT NULL DEFAULT 0,
    UNIQUE (
        file_clean_up,
        file_stage_in_http, file_stage_in_https, file_stage_in_ftp, file_stage_in_gsiftp,
        file_stage_in_shared_http, file_stage_in_shared_https,
        file_stage_in_shared_ftp, file_stage_in_shared_gsiftp,
        file_stage_out_http, file_stage_out_https, file_stage_out_ftp, file_stage_out_gsiftp
    )
);

CREATE TABLE IF NOT EXISTS gram5_jobs (
    id INTEGER PRIMARY KEY,
    job_manager_id INTEGER REFERENCES gram5_job_manager_instances(id),
    send_time TEXT NOT NULL,
    count INTEGER NOT NULL,
    host_count INTEGER NOT NULL,
    dryrun BOOLEAN NOT NULL,
    client_id INTEGER REFERENCES gram5_client(id),
    executable_id INTEGER REFERENCES gram5_executable(id),
    rsl_bitfield TEXT NOT NULL REFERENCES gram5_rsl_attribute_groups(bitfield),
    jobtype INTEGER REFERENCES gram5_job_types(id),
    gram5_job_file_info INTEGER REFERENCES gram5_job_file_info(id)
);

CREATE TABLE IF NOT EXISTS gram5_job_status (
    job_id INTEGER NOT NULL REFERENCES gram5_jobs(id),
    send_time TEXT NOT NULL,
    unsubmitted_timestamp TEXT,
    file_stage_in_timestamp TEXT,
    pending_timestamp TEXT,
    active_timestamp TEXT,
    failed_timestamp TEXT,
    file_stage_out_timestamp TEXT,
    done_timestamp TEXT,
    status_count INTEGER NOT NULL,
    register_count INTEGER NOT NULL,
    unregister_count INTEGER NOT NULL,
    signal_count INTEGER NOT NULL,
    refresh_count INTEGER NOT NULL,
    failure_code INTEGER NOT NULL,
    restart_count INTEGER NOT NULL,
    callback_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS gram5_job_manager_status (
    job_manager_instance_id INTEGER REFERENCES gram5_job_manager_instances(id),
    restarted_jobs INTEGER,
    status_time TEXT NOT NULL,
    lifetime TEXT NOT NULL,
    total_jobs INTEGER,
    total_failed INTEGER,
    total_canceled INTEGER,
    total_done INTEGER,
    total_dry_run INTEGER,
    peak_jobs INTEGER,
    current_jobs INTEGER,
    unsubmitted INTEGER,
    stage_in INTEGER,
    pending INTEGER,
    active INTEGER,
    stage_out INTEGER,
    failed INTEGER,
    done INTEGER
);
"#;

/// Create every table that does not exist yet.
pub fn ensure_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
