//! Upload orchestrator.
//!
//! An [`Uploader`] owns the cache registry and host resolver for the
//! lifetime of the process. The first `upload` warms both; every later
//! call reuses them. Each packet runs inside its own SAVEPOINT so a
//! failure rolls back that packet's rows and cache entries together,
//! and the rest of the batch carries on.
//!
//! Packet journals are committed when their savepoint is released, so
//! the caches trust the enclosing transaction to commit as well. When it
//! does not, [`Uploader::reset`] drops every cached id and the next upload
//! warms again from what the store actually holds.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use gramstat_core::Packet;
use gramstat_store::{HostResolver, StoreResult};

use crate::error::{IngestError, IngestResult, ResolveResult};
use crate::facts::{self, Fact};
use crate::registry::CacheRegistry;
use crate::resolve::ResolveContext;
use crate::version::VersionParser;

const SAVEPOINT: &str = "gramstat_packet";

/// Outcome of one `upload` call.
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Packets whose fact row was inserted.
    pub inserted: usize,
    /// Packets that were rolled back, in batch order.
    pub failed: Vec<IngestError>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn absorb(&mut self, other: UploadReport) {
        self.inserted += other.inserted;
        self.failed.extend(other.failed);
    }
}

pub struct Uploader<H: HostResolver> {
    caches: CacheRegistry,
    hosts: H,
    versions: VersionParser,
    hosts_warm: bool,
}

impl<H: HostResolver> Uploader<H> {
    pub fn new(hosts: H) -> Result<Self, regex::Error> {
        Self::with_caches(CacheRegistry::new(), hosts)
    }

    /// Use an existing registry, e.g. one shared with an earlier uploader.
    pub fn with_caches(caches: CacheRegistry, hosts: H) -> Result<Self, regex::Error> {
        Ok(Self {
            caches,
            hosts,
            versions: VersionParser::new()?,
            hosts_warm: false,
        })
    }

    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    pub fn hosts(&self) -> &H {
        &self.hosts
    }

    pub fn into_caches(self) -> CacheRegistry {
        self.caches
    }

    /// Forget every cached id. Call after the transaction an upload ran in
    /// was rolled back or failed to commit.
    pub fn reset(&mut self) {
        self.caches = CacheRegistry::new();
        self.hosts.reset();
        self.hosts_warm = false;
        warn!("dimension caches reset, next upload reloads them");
    }

    /// Upload `packets` inside one transaction on `conn` and commit it.
    /// If the commit fails the caches are reset before returning.
    pub fn upload_batch<P: Packet>(
        &mut self,
        conn: &mut Connection,
        packets: &[P],
    ) -> IngestResult<UploadReport> {
        let tx = conn
            .transaction()
            .map_err(|err| IngestError::Commit(err.into()))?;
        let report = match self.upload(&tx, packets) {
            Ok(report) => report,
            Err(err) => {
                drop(tx);
                self.reset();
                return Err(err);
            }
        };
        if let Err(err) = tx.commit() {
            self.reset();
            return Err(IngestError::Commit(err.into()));
        }
        Ok(report)
    }

    fn warm(&mut self, session: &Connection) -> IngestResult<()> {
        if !self.hosts_warm {
            self.hosts.warm(session).map_err(IngestError::Warmup)?;
            self.hosts_warm = true;
        }
        self.caches.load_all(session).map_err(IngestError::Warmup)
    }

    /// Resolve and insert every packet, in order, on `session`.
    ///
    /// Only a warm-up failure is returned as `Err`; per-packet failures
    /// are collected in the report.
    pub fn upload<P: Packet>(
        &mut self,
        session: &Connection,
        packets: &[P],
    ) -> IngestResult<UploadReport> {
        self.warm(session)?;

        let mut report = UploadReport::default();
        for (index, packet) in packets.iter().enumerate() {
            match self.upload_one(session, index, packet) {
                Ok(fact) => {
                    debug!(index, table = fact.table(), "packet stored");
                    report.inserted += 1;
                }
                Err(err) => {
                    warn!(error = %err, "packet rolled back");
                    report.failed.push(err);
                }
            }
        }

        info!(
            packets = packets.len(),
            inserted = report.inserted,
            failed = report.failed.len(),
            "batch uploaded"
        );
        Ok(report)
    }

    fn upload_one<P: Packet>(
        &mut self,
        session: &Connection,
        index: usize,
        packet: &P,
    ) -> IngestResult<Fact> {
        begin(session).map_err(|source| IngestError::Session { index, source })?;

        match self.store_packet(session, packet) {
            Ok(fact) => match release(session) {
                Ok(()) => {
                    self.caches.commit();
                    self.hosts.commit();
                    Ok(fact)
                }
                Err(source) => {
                    self.abandon(session)
                        .map_err(|source| IngestError::Session { index, source })?;
                    Err(IngestError::Session { index, source })
                }
            },
            Err(source) => {
                self.abandon(session)
                    .map_err(|source| IngestError::Session { index, source })?;
                Err(IngestError::Packet {
                    index,
                    kind: packet.kind(),
                    source,
                })
            }
        }
    }

    fn store_packet<P: Packet>(&mut self, session: &Connection, packet: &P) -> ResolveResult<Fact> {
        let mut ctx = ResolveContext {
            session,
            caches: &mut self.caches,
            hosts: &mut self.hosts,
            versions: &self.versions,
        };
        let fact = facts::resolve_and_build(&mut ctx, packet)?;
        fact.insert(session)?;
        Ok(fact)
    }

    /// Undo the current packet in every cache and in the store. A failed
    /// store rollback leaves the session in an unknown state and is
    /// returned to the caller.
    fn abandon(&mut self, session: &Connection) -> StoreResult<()> {
        let dropped = self.caches.rollback();
        self.hosts.rollback();
        if dropped > 0 {
            debug!(dropped, "cache entries discarded");
        }
        rollback(session)
    }
}

fn begin(session: &Connection) -> StoreResult<()> {
    session.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
    Ok(())
}

fn release(session: &Connection) -> StoreResult<()> {
    session.execute_batch(&format!("RELEASE {SAVEPOINT}"))?;
    Ok(())
}

fn rollback(session: &Connection) -> StoreResult<()> {
    session.execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}"))?;
    Ok(())
}
