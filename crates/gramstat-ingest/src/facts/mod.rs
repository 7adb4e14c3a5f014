//! Fact builders, one per packet kind.
//!
//! A builder parses the packet's literal values first, so a malformed
//! counter fails the packet before any dimension row is created, then
//! resolves foreign keys through [`ResolveContext`] in dependency order.

mod job;
mod job_manager;

pub use job::build_job_status;
pub use job_manager::build_job_manager_status;

use rusqlite::Connection;

use gramstat_core::{Packet, PacketKind};
use gramstat_store::{FactRow, JobManagerStatusRow, JobStatusRow};

use crate::error::{AtStep, ResolveResult, Step};
use crate::resolve::ResolveContext;

/// A fact row ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Fact {
    JobManagerStatus(JobManagerStatusRow),
    JobStatus(JobStatusRow),
}

impl Fact {
    pub fn table(&self) -> &'static str {
        match self {
            Fact::JobManagerStatus(_) => JobManagerStatusRow::TABLE,
            Fact::JobStatus(_) => JobStatusRow::TABLE,
        }
    }

    pub fn insert(&self, session: &Connection) -> ResolveResult<()> {
        match self {
            Fact::JobManagerStatus(row) => row.insert(session),
            Fact::JobStatus(row) => row.insert(session),
        }
        .at(Step::FactInsert)
    }
}

/// Resolve every dimension the packet references and build its fact row.
pub fn resolve_and_build(ctx: &mut ResolveContext<'_>, packet: &impl Packet) -> ResolveResult<Fact> {
    match packet.kind() {
        PacketKind::JobManagerStatus => build_job_manager_status(ctx, packet).map(Fact::JobManagerStatus),
        PacketKind::JobStatus => build_job_status(ctx, packet).map(Fact::JobStatus),
    }
}
