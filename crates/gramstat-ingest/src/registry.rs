//! CacheRegistry — every dimension cache the ingest path resolves through.
//!
//! One registry lives as long as the ingesting process. `load_all` warms
//! every cache on first use and is a no-op afterwards; entries are only
//! ever added. `commit`/`rollback` bracket each packet so a packet whose
//! savepoint was rolled back leaves no ids behind.

use rusqlite::Connection;
use tracing::info;

use gramstat_store::{
    BitfieldRegistry, Clients, DimensionCache, Executables, FileStagingInfos,
    JobManagerInstanceCache, JobManagers, JobTypes, Lrms, RslAttributes, StoreResult, Versions,
    tables,
};

#[derive(Debug, Default)]
pub struct CacheRegistry {
    loaded: bool,
    pub versions: DimensionCache<Versions>,
    pub lrms: DimensionCache<Lrms>,
    pub job_managers: DimensionCache<JobManagers>,
    pub instances: JobManagerInstanceCache,
    pub rsl_attributes: DimensionCache<RslAttributes>,
    pub rsl_groups: BitfieldRegistry,
    pub job_types: DimensionCache<JobTypes>,
    pub clients: DimensionCache<Clients>,
    pub executables: DimensionCache<Executables>,
    pub file_staging: DimensionCache<FileStagingInfos>,
}

/// Entry counts per cached table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: Vec<(&'static str, usize)>,
}

impl CacheStats {
    pub fn get(&self, table: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Warm every cache. Runs once; later calls return immediately.
    ///
    /// Parents load before the tables that reference them, although the
    /// caches do not depend on each other's contents.
    pub fn load_all(&mut self, session: &Connection) -> StoreResult<()> {
        if self.loaded {
            return Ok(());
        }
        self.versions.load_all(session)?;
        self.lrms.load_all(session)?;
        self.job_managers.load_all(session)?;
        self.instances.load_all(session)?;
        self.rsl_attributes.load_all(session)?;
        self.rsl_groups.load_all(session)?;
        self.job_types.load_all(session)?;
        self.clients.load_all(session)?;
        self.executables.load_all(session)?;
        self.file_staging.load_all(session)?;
        self.loaded = true;

        let stats = self.stats();
        info!(entries = stats.total(), "dimension caches loaded");
        Ok(())
    }

    /// Keep every entry added since the last commit/rollback.
    pub fn commit(&mut self) {
        self.versions.commit();
        self.lrms.commit();
        self.job_managers.commit();
        self.instances.commit();
        self.rsl_attributes.commit();
        self.rsl_groups.commit();
        self.job_types.commit();
        self.clients.commit();
        self.executables.commit();
        self.file_staging.commit();
    }

    /// Drop every entry added since the last commit/rollback. Returns how
    /// many were dropped.
    pub fn rollback(&mut self) -> usize {
        self.versions.rollback()
            + self.lrms.rollback()
            + self.job_managers.rollback()
            + self.instances.rollback()
            + self.rsl_attributes.rollback()
            + self.rsl_groups.rollback()
            + self.job_types.rollback()
            + self.clients.rollback()
            + self.executables.rollback()
            + self.file_staging.rollback()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: vec![
                (tables::VERSIONS, self.versions.len()),
                (tables::LRMS, self.lrms.len()),
                (tables::JOB_MANAGERS, self.job_managers.len()),
                (tables::JOB_MANAGER_INSTANCES, self.instances.len()),
                (tables::RSL_ATTRIBUTES, self.rsl_attributes.len()),
                (tables::RSL_ATTRIBUTE_GROUPS, self.rsl_groups.len()),
                (tables::JOB_TYPES, self.job_types.len()),
                (tables::CLIENTS, self.clients.len()),
                (tables::EXECUTABLES, self.executables.len()),
                (tables::JOB_FILE_INFO, self.file_staging.len()),
            ],
        }
    }
}
