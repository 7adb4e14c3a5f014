//! Field codes carried in GRAM5 usage packets.
//!
//! Codes are single characters except `HOSTNAME`. The job manager sends
//! every value as text; parsing happens in the ingest crate.

// ── Shared by both packet kinds ────────────────────────────────────

/// Job manager start time, epoch seconds as a float.
pub const START_TIME: &str = "A";
/// Job manager instance UUID.
pub const UUID: &str = "B";
/// Job manager version string, e.g. `3.14 (gcc32dbg, 1222134484-78) [Globus Toolkit 4.2.0]`.
pub const VERSION: &str = "D";
/// Local resource manager name.
pub const LRM: &str = "E";
/// `"0"` when the scheduler event generator is used, `"1"` when polling.
pub const SEG_OR_POLL: &str = "F";
/// `"1"` when audit logging is enabled.
pub const AUDIT: &str = "G";
/// Host name of the sending job manager.
pub const HOSTNAME: &str = "HOSTNAME";

// ── Job manager status ─────────────────────────────────────────────

pub const RESTARTED_JOBS: &str = "I";
pub const TOTAL_JOBS: &str = "K";
pub const TOTAL_FAILED: &str = "L";
pub const TOTAL_CANCELED: &str = "M";
pub const TOTAL_DONE: &str = "N";
pub const TOTAL_DRY_RUN: &str = "O";
pub const PEAK_JOBS: &str = "P";
pub const CURRENT_JOBS: &str = "Q";
pub const JOBS_UNSUBMITTED: &str = "R";
pub const JOBS_STAGE_IN: &str = "S";
pub const JOBS_PENDING: &str = "T";
pub const JOBS_ACTIVE: &str = "U";
pub const JOBS_STAGE_OUT: &str = "V";
pub const JOBS_FAILED: &str = "W";
pub const JOBS_DONE: &str = "X";

// ── Job status ─────────────────────────────────────────────────────

/// Standard RSL attributes, as a decimal bitfield.
pub const RSL_BITFIELD: &str = "1";
pub const UNREGISTER_COUNT: &str = "2";
pub const COUNT: &str = "3";
/// Comma-separated extension RSL attribute names.
pub const RSL_EXTENSIONS: &str = "4";
pub const EXECUTABLE: &str = "6";
pub const ARGUMENTS: &str = "7";
/// Client contact as `address:port`.
pub const CLIENT_ADDRESS: &str = "8";
pub const USER_DN: &str = "9";
/// `"1"` for a dry run.
pub const DRY_RUN: &str = "a";
pub const HOST_COUNT: &str = "b";

pub const UNSUBMITTED_TIMESTAMP: &str = "c";
pub const STAGE_IN_TIMESTAMP: &str = "d";
pub const PENDING_TIMESTAMP: &str = "e";
pub const ACTIVE_TIMESTAMP: &str = "f";
pub const FAILED_TIMESTAMP: &str = "g";
pub const STAGE_OUT_TIMESTAMP: &str = "h";
pub const DONE_TIMESTAMP: &str = "i";

pub const FAILURE_CODE: &str = "j";
pub const STATUS_COUNT: &str = "k";
pub const REGISTER_COUNT: &str = "l";
pub const SIGNAL_COUNT: &str = "m";
pub const REFRESH_COUNT: &str = "n";
pub const RESTART_COUNT: &str = "Y";
pub const CALLBACK_COUNT: &str = "Z";
pub const JOB_TYPE: &str = "H";

/// File staging counters, in `gram5_job_file_info` column order.
pub const FILE_STAGING: [&str; 13] = [
    "o", // file_clean_up
    "p", // file_stage_in_http
    "q", // file_stage_in_https
    "r", // file_stage_in_ftp
    "s", // file_stage_in_gsiftp
    "t", // file_stage_in_shared_http
    "u", // file_stage_in_shared_https
    "v", // file_stage_in_shared_ftp
    "w", // file_stage_in_shared_gsiftp
    "x", // file_stage_out_http
    "y", // file_stage_out_https
    "z", // file_stage_out_ftp
    "0", // file_stage_out_gsiftp
];
