//! Usage packet abstraction.
//!
//! Packet framing and transport live outside this workspace. What reaches
//! the ingest path is a flat field-code → text mapping plus the sender's
//! address and the time the packet was sent. [`Packet`] is that seam;
//! [`UsagePacket`] is the owned, serde-friendly implementation used by the
//! CLI and the tests.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which GRAM5 event a packet describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    /// Periodic job manager status.
    JobManagerStatus,
    /// Terminal status of a single job.
    JobStatus,
}

impl PacketKind {
    /// Usage-stats component code carried in the packet header.
    pub fn component_code(&self) -> u16 {
        match self {
            PacketKind::JobManagerStatus => 20,
            PacketKind::JobStatus => 21,
        }
    }

    pub fn from_component_code(code: u16) -> Option<Self> {
        match code {
            20 => Some(PacketKind::JobManagerStatus),
            21 => Some(PacketKind::JobStatus),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PacketKind::JobManagerStatus => "job manager status",
            PacketKind::JobStatus => "job status",
        }
    }
}

/// A field was present but could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("required field {code:?} is missing")]
    Missing { code: String },

    #[error("field {code:?} is not numeric: {value:?}")]
    NotNumeric { code: String, value: String },

    #[error("field {code:?} is out of range: {value:?}")]
    OutOfRange { code: String, value: String },
}

impl FieldError {
    pub fn missing(code: &str) -> Self {
        FieldError::Missing {
            code: code.to_string(),
        }
    }

    pub fn not_numeric(code: &str, value: &str) -> Self {
        FieldError::NotNumeric {
            code: code.to_string(),
            value: value.to_string(),
        }
    }

    pub fn out_of_range(code: &str, value: impl ToString) -> Self {
        FieldError::OutOfRange {
            code: code.to_string(),
            value: value.to_string(),
        }
    }
}

/// Convert epoch seconds (possibly fractional) to a UTC timestamp.
///
/// Sub-microsecond precision is rounded away. Returns `None` for
/// non-finite input or values outside chrono's range.
pub fn timestamp_from_ticks(ticks: f64) -> Option<DateTime<Utc>> {
    if !ticks.is_finite() {
        return None;
    }
    let micros = (ticks * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// Read access to a parsed usage packet.
pub trait Packet {
    fn kind(&self) -> PacketKind;

    /// Raw text value of a field, if the sender included it.
    fn field(&self, code: &str) -> Option<&str>;

    /// Address the packet arrived from.
    fn sender(&self) -> IpAddr;

    /// Send time as epoch seconds.
    fn send_time_ticks(&self) -> f64;

    /// Send time as a UTC timestamp.
    fn send_time(&self) -> Result<DateTime<Utc>, FieldError> {
        let ticks = self.send_time_ticks();
        timestamp_from_ticks(ticks).ok_or_else(|| FieldError::out_of_range("send_time", ticks))
    }

    /// Integer field. Absent and empty both read as `None`.
    fn int_field(&self, code: &str) -> Result<Option<i64>, FieldError> {
        match self.field(code).map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| FieldError::not_numeric(code, value)),
        }
    }

    /// Float field. Absent and empty both read as `None`.
    fn float_field(&self, code: &str) -> Result<Option<f64>, FieldError> {
        match self.field(code).map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => match value.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
                _ => Err(FieldError::not_numeric(code, value)),
            },
        }
    }
}

/// Owned usage packet, one JSON object per line in the CLI input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePacket {
    pub kind: PacketKind,
    pub sender: IpAddr,
    /// Epoch seconds.
    pub send_time: f64,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl UsagePacket {
    pub fn new(kind: PacketKind, sender: IpAddr, send_time: f64) -> Self {
        Self {
            kind,
            sender,
            send_time,
            fields: HashMap::new(),
        }
    }

    /// Builder-style field setter, mostly for tests.
    pub fn with(mut self, code: &str, value: impl Into<String>) -> Self {
        self.fields.insert(code.to_string(), value.into());
        self
    }

    /// Parse one JSON-lines record.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

impl Packet for UsagePacket {
    fn kind(&self) -> PacketKind {
        self.kind
    }

    fn field(&self, code: &str) -> Option<&str> {
        self.fields.get(code).map(String::as_str)
    }

    fn sender(&self) -> IpAddr {
        self.sender
    }

    fn send_time_ticks(&self) -> f64 {
        self.send_time
    }
}
