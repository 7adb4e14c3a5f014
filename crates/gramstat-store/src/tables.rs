//! Table names of the usage store.
//!
//! These names are the persisted schema contract shared with existing
//! GRAM5 usage databases and must not change.

/// Hosts, owned by the host resolver.
pub const DNS_CACHE: &str = "dns_cache";

// ── Dimensions ─────────────────────────────────────────────────────

pub const VERSIONS: &str = "gram5_versions";
pub const LRMS: &str = "gram5_lrms";
pub const JOB_MANAGERS: &str = "gram5_job_managers";
pub const JOB_MANAGER_INSTANCES: &str = "gram5_job_manager_instances";
pub const RSL_ATTRIBUTES: &str = "gram5_rsl_attributes";
pub const RSL_ATTRIBUTE_GROUPS: &str = "gram5_rsl_attribute_groups";
pub const JOB_TYPES: &str = "gram5_job_types";
pub const CLIENTS: &str = "gram5_client";
pub const EXECUTABLES: &str = "gram5_executable";
pub const JOB_FILE_INFO: &str = "gram5_job_file_info";

// ── Facts ──────────────────────────────────────────────────────────

pub const JOBS: &str = "gram5_jobs";
pub const JOB_STATUS: &str = "gram5_job_status";
pub const JOB_MANAGER_STATUS: &str = "gram5_job_manager_status";
