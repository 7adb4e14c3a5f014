//! Error types for packet ingest.

use std::fmt;

use thiserror::Error;

use gramstat_core::{FieldError, PacketKind};
use gramstat_store::StoreError;

/// Result type alias for a batch upload.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type alias for resolving one packet.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// The resolution step a packet was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SendTime,
    Host,
    Version,
    Lrm,
    JobManager,
    JobManagerInstance,
    Client,
    Executable,
    RslBitfield,
    JobType,
    FileStagingInfo,
    Job,
    Lifetime,
    StageTimestamps,
    Counters,
    FactInsert,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::SendTime => "send time",
            Step::Host => "host",
            Step::Version => "version",
            Step::Lrm => "lrm",
            Step::JobManager => "job manager",
            Step::JobManagerInstance => "job manager instance",
            Step::Client => "client",
            Step::Executable => "executable",
            Step::RslBitfield => "rsl bitfield",
            Step::JobType => "job type",
            Step::FileStagingInfo => "file staging info",
            Step::Job => "job",
            Step::Lifetime => "lifetime",
            Step::StageTimestamps => "stage timestamps",
            Step::Counters => "counters",
            Step::FactInsert => "fact insert",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single packet could not be resolved or stored.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{step}: {source}")]
    Field {
        step: Step,
        #[source]
        source: FieldError,
    },

    #[error("{step}: {source}")]
    Store {
        step: Step,
        #[source]
        source: StoreError,
    },
}

impl ResolveError {
    pub fn step(&self) -> Step {
        match self {
            ResolveError::Field { step, .. } | ResolveError::Store { step, .. } => *step,
        }
    }
}

/// Attach the failing [`Step`] to a lower-level error.
pub(crate) trait AtStep<T> {
    fn at(self, step: Step) -> ResolveResult<T>;
}

impl<T> AtStep<T> for Result<T, FieldError> {
    fn at(self, step: Step) -> ResolveResult<T> {
        self.map_err(|source| ResolveError::Field { step, source })
    }
}

impl<T> AtStep<T> for Result<T, StoreError> {
    fn at(self, step: Step) -> ResolveResult<T> {
        self.map_err(|source| ResolveError::Store { step, source })
    }
}

/// Errors surfaced by [`crate::Uploader`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cache warm-up failed: {0}")]
    Warmup(#[source] StoreError),

    #[error("packet {index} ({}): {source}", .kind.label())]
    Packet {
        index: usize,
        kind: PacketKind,
        #[source]
        source: ResolveError,
    },

    #[error("batch commit failed: {0}")]
    Commit(#[source] StoreError),

    #[error("packet {index}: storage session error: {source}")]
    Session {
        index: usize,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// Index of the failing packet within its batch, if any.
    pub fn packet_index(&self) -> Option<usize> {
        match self {
            IngestError::Warmup(_) | IngestError::Commit(_) => None,
            IngestError::Packet { index, .. } | IngestError::Session { index, .. } => Some(*index),
        }
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            IngestError::Packet { source, .. } => Some(source.step()),
            _ => None,
        }
    }
}
