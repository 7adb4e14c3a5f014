//! Per-packet dimension resolution.
//!
//! [`ResolveContext`] borrows everything one packet needs: the storage
//! session, the cache registry, the host resolver and the version parser.
//! Each method resolves a single foreign key, creating dimension rows on
//! first sight, and tags failures with the [`Step`] they happened in.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::Zero;
use rusqlite::Connection;
use tracing::warn;

use gramstat_core::{FieldError, Packet, fields, timestamp_from_ticks};
use gramstat_store::{
    ClientKey, ExecutableKey, FileStagingKey, HostResolver, JobManagerInstanceKey, JobManagerKey,
};

use crate::error::{AtStep, ResolveResult, Step};
use crate::registry::CacheRegistry;
use crate::rsl;
use crate::version::VersionParser;

pub struct ResolveContext<'a> {
    pub session: &'a Connection,
    pub caches: &'a mut CacheRegistry,
    pub hosts: &'a mut dyn HostResolver,
    pub versions: &'a VersionParser,
}

/// Non-empty text of a field.
fn text<'p>(packet: &'p impl Packet, code: &str) -> Option<&'p str> {
    packet.field(code).map(str::trim).filter(|value| !value.is_empty())
}

impl ResolveContext<'_> {
    /// The sending host, keyed by source address and reported host name.
    pub fn host_id(&mut self, packet: &impl Packet) -> ResolveResult<i64> {
        let address = packet.sender().to_string();
        self.hosts
            .resolve(self.session, &address, text(packet, fields::HOSTNAME))
            .at(Step::Host)
    }

    /// `None` when the version field is absent or does not parse.
    pub fn version_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let Some(raw) = text(packet, fields::VERSION) else {
            return Ok(None);
        };
        let Some(key) = self.versions.parse(raw) else {
            warn!(version = raw, "unparseable job manager version, storing NULL");
            return Ok(None);
        };
        self.caches
            .versions
            .get_or_create(self.session, &key)
            .map(Some)
            .at(Step::Version)
    }

    pub fn lrm_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let Some(lrm) = text(packet, fields::LRM) else {
            return Ok(None);
        };
        self.caches
            .lrms
            .get_or_create(self.session, &lrm.to_string())
            .map(Some)
            .at(Step::Lrm)
    }

    /// Host, version and LRM first, then the job manager they identify.
    pub fn job_manager_id(&mut self, packet: &impl Packet) -> ResolveResult<i64> {
        let host_id = self.host_id(packet)?;
        let version_id = self.version_id(packet)?;
        let lrm_id = self.lrm_id(packet)?;
        let seg_or_poll = text(packet, fields::SEG_OR_POLL);
        let key = JobManagerKey {
            host_id: Some(host_id),
            version_id,
            lrm_id,
            seg_used: seg_or_poll == Some("0"),
            poll_used: seg_or_poll == Some("1"),
            audit_used: text(packet, fields::AUDIT) == Some("1"),
        };
        self.caches
            .job_managers
            .get_or_create(self.session, &key)
            .at(Step::JobManager)
    }

    fn start_time(packet: &impl Packet) -> ResolveResult<Option<DateTime<Utc>>> {
        let Some(ticks) = packet.float_field(fields::START_TIME).at(Step::JobManagerInstance)? else {
            return Ok(None);
        };
        timestamp_from_ticks(ticks)
            .map(Some)
            .ok_or_else(|| FieldError::out_of_range(fields::START_TIME, ticks))
            .at(Step::JobManagerInstance)
    }

    /// Instance of a fully identified job manager. `None` without a uuid.
    ///
    /// The job manager chain is resolved even when the uuid is already
    /// known, so its host, version and LRM rows are always recorded.
    pub fn job_manager_instance_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let start_time = Self::start_time(packet)?;
        let job_manager_id = self.job_manager_id(packet)?;
        let Some(uuid) = text(packet, fields::UUID) else {
            return Ok(None);
        };
        if let Some(id) = self.caches.instances.get_by_uuid(uuid) {
            return Ok(Some(id));
        }
        let key = JobManagerInstanceKey {
            job_manager_id: Some(job_manager_id),
            uuid: uuid.to_string(),
            start_time,
        };
        self.caches
            .instances
            .get_or_create(self.session, &key)
            .map(Some)
            .at(Step::JobManagerInstance)
    }

    /// Instance looked up by uuid alone; the job manager may be unknown.
    pub fn job_manager_instance_id_by_uuid(
        &mut self,
        packet: &impl Packet,
    ) -> ResolveResult<Option<i64>> {
        let Some(uuid) = text(packet, fields::UUID) else {
            return Ok(None);
        };
        if let Some(id) = self.caches.instances.get_by_uuid(uuid) {
            return Ok(Some(id));
        }
        let start_time = Self::start_time(packet)?;
        self.caches
            .instances
            .get_or_create_by_uuid(self.session, uuid, start_time)
            .map(Some)
            .at(Step::JobManagerInstance)
    }

    /// Client from its `address:port` and DN. `None` when both are absent.
    pub fn client_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let host_id = match text(packet, fields::CLIENT_ADDRESS) {
            Some(contact) => {
                let address = contact.rsplit_once(':').map_or(contact, |(addr, _port)| addr);
                Some(self.hosts.resolve(self.session, address, None).at(Step::Client)?)
            }
            None => None,
        };
        let dn = text(packet, fields::USER_DN).map(str::to_string);
        if host_id.is_none() && dn.is_none() {
            return Ok(None);
        }
        self.caches
            .clients
            .get_or_create(self.session, &ClientKey { host_id, dn })
            .map(Some)
            .at(Step::Client)
    }

    pub fn executable_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let Some(path) = text(packet, fields::EXECUTABLE) else {
            return Ok(None);
        };
        let key = ExecutableKey {
            path: path.to_string(),
            arguments: packet.field(fields::ARGUMENTS).map(str::to_string),
        };
        self.caches
            .executables
            .get_or_create(self.session, &key)
            .map(Some)
            .at(Step::Executable)
    }

    /// Canonical bitfield of the job's RSL attributes. A missing base
    /// bitfield counts as zero.
    pub fn rsl_bitfield(&mut self, packet: &impl Packet) -> ResolveResult<BigUint> {
        let base = match text(packet, fields::RSL_BITFIELD) {
            None => BigUint::zero(),
            Some(raw) => rsl::parse_base(raw)
                .ok_or_else(|| FieldError::not_numeric(fields::RSL_BITFIELD, raw))
                .at(Step::RslBitfield)?,
        };
        let caches = &mut *self.caches;
        rsl::canonicalize(
            self.session,
            &mut caches.rsl_attributes,
            &mut caches.rsl_groups,
            base,
            packet.field(fields::RSL_EXTENSIONS),
        )
        .at(Step::RslBitfield)
    }

    pub fn job_type_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let Some(job_type) = text(packet, fields::JOB_TYPE) else {
            return Ok(None);
        };
        self.caches
            .job_types
            .get_or_create(self.session, &job_type.to_string())
            .map(Some)
            .at(Step::JobType)
    }

    /// `None`, and no row, when the job did no file staging at all.
    pub fn file_info_id(&mut self, packet: &impl Packet) -> ResolveResult<Option<i64>> {
        let mut key = FileStagingKey::default();
        for (count, code) in key.counts.iter_mut().zip(fields::FILE_STAGING) {
            *count = packet.int_field(code).at(Step::FileStagingInfo)?.unwrap_or(0);
        }
        if key.is_trivial() {
            return Ok(None);
        }
        self.caches
            .file_staging
            .get_or_create(self.session, &key)
            .map(Some)
            .at(Step::FileStagingInfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use gramstat_core::{PacketKind, UsagePacket};
    use gramstat_store::{DnsCache, UsageStore};

    struct Fixture {
        store: UsageStore,
        caches: CacheRegistry,
        hosts: DnsCache,
        versions: VersionParser,
    }

    impl Fixture {
        fn new() -> Self {
            let store = UsageStore::open_in_memory().unwrap();
            let mut caches = CacheRegistry::new();
            caches.load_all(store.connection()).unwrap();
            let mut hosts = DnsCache::new();
            hosts.warm(store.connection()).unwrap();
            Self {
                store,
                caches,
                hosts,
                versions: VersionParser::new().unwrap(),
            }
        }

        fn ctx(&mut self) -> ResolveContext<'_> {
            ResolveContext {
                session: self.store.connection(),
                caches: &mut self.caches,
                hosts: &mut self.hosts,
                versions: &self.versions,
            }
        }
    }

    fn job_packet() -> UsagePacket {
        UsagePacket::new(
            PacketKind::JobStatus,
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)),
            1_222_135_000.0,
        )
    }

    #[test]
    fn garbage_version_resolves_to_null() {
        let mut fx = Fixture::new();
        let packet = job_packet().with(fields::VERSION, "garbage");
        assert_eq!(fx.ctx().version_id(&packet).unwrap(), None);
        assert_eq!(fx.store.row_count("gram5_versions").unwrap(), 0);
    }

    #[test]
    fn job_manager_flags_follow_seg_and_audit_fields() {
        let mut fx = Fixture::new();
        let seg = job_packet().with(fields::SEG_OR_POLL, "0").with(fields::AUDIT, "1");
        let poll = job_packet().with(fields::SEG_OR_POLL, "1");

        let a = fx.ctx().job_manager_id(&seg).unwrap();
        let b = fx.ctx().job_manager_id(&poll).unwrap();
        assert_ne!(a, b);

        let (seg_used, poll_used, audit_used): (bool, bool, bool) = fx
            .store
            .connection()
            .query_row(
                "SELECT seg_used, poll_used, audit_used FROM gram5_job_managers WHERE id = ?1",
                [a],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert!(seg_used && !poll_used && audit_used);
    }

    #[test]
    fn client_needs_address_or_dn() {
        let mut fx = Fixture::new();
        assert_eq!(fx.ctx().client_id(&job_packet()).unwrap(), None);

        let by_dn = job_packet().with(fields::USER_DN, "/O=Grid/CN=Alice");
        let by_addr = job_packet().with(fields::CLIENT_ADDRESS, "198.51.100.4:40001");
        let same_addr_other_port = job_packet().with(fields::CLIENT_ADDRESS, "198.51.100.4:40002");

        let dn_id = fx.ctx().client_id(&by_dn).unwrap().unwrap();
        let addr_id = fx.ctx().client_id(&by_addr).unwrap().unwrap();
        assert_ne!(dn_id, addr_id);
        assert_eq!(fx.ctx().client_id(&same_addr_other_port).unwrap(), Some(addr_id));
        assert_eq!(fx.store.row_count("gram5_client").unwrap(), 2);
    }

    #[test]
    fn uuid_lookup_reuses_known_instance() {
        let mut fx = Fixture::new();
        let status = job_packet()
            .with(fields::UUID, "jm-1")
            .with(fields::START_TIME, "1222134000");
        let full = fx.ctx().job_manager_instance_id(&status).unwrap();

        let job = job_packet().with(fields::UUID, "jm-1");
        assert_eq!(fx.ctx().job_manager_instance_id_by_uuid(&job).unwrap(), full);
        assert_eq!(fx.store.row_count("gram5_job_manager_instances").unwrap(), 1);
    }

    #[test]
    fn known_uuid_still_records_the_job_manager() {
        let mut fx = Fixture::new();
        let job = job_packet().with(fields::UUID, "jm-2");
        let instance = fx.ctx().job_manager_instance_id_by_uuid(&job).unwrap();

        let status = job_packet()
            .with(fields::UUID, "jm-2")
            .with(fields::LRM, "condor")
            .with(fields::VERSION, "3.14 (gcc32dbg, 1222134484-78)");
        assert_eq!(fx.ctx().job_manager_instance_id(&status).unwrap(), instance);
        assert_eq!(fx.store.row_count("gram5_job_managers").unwrap(), 1);
        assert_eq!(fx.store.row_count("gram5_lrms").unwrap(), 1);
        assert_eq!(fx.store.row_count("gram5_versions").unwrap(), 1);
    }

    #[test]
    fn bad_base_bitfield_names_the_step() {
        let mut fx = Fixture::new();
        let packet = job_packet().with(fields::RSL_BITFIELD, "lots");
        let err = fx.ctx().rsl_bitfield(&packet).unwrap_err();
        assert_eq!(err.step(), Step::RslBitfield);
    }

    #[test]
    fn file_info_skips_trivial_staging() {
        let mut fx = Fixture::new();
        let none = job_packet().with("o", "0");
        assert_eq!(fx.ctx().file_info_id(&none).unwrap(), None);

        let one = job_packet().with("r", "2");
        assert!(fx.ctx().file_info_id(&one).unwrap().is_some());
        assert_eq!(fx.store.row_count("gram5_job_file_info").unwrap(), 1);
    }
}
