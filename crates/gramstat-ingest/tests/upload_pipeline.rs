//! End-to-end uploads against an in-memory store.

use std::net::{IpAddr, Ipv4Addr};

use gramstat_core::{PacketKind, UsagePacket, fields};
use gramstat_ingest::{IngestError, Step, Uploader};
use gramstat_store::{DnsCache, RslAttributes, UsageStore, tables};

const SEND_TIME: f64 = 1_222_135_000.0;

fn sender() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, 50))
}

fn jm_status(uuid: &str) -> UsagePacket {
    UsagePacket::new(PacketKind::JobManagerStatus, sender(), SEND_TIME)
        .with(fields::START_TIME, "1222131400")
        .with(fields::UUID, uuid)
        .with(fields::VERSION, "3.14 (gcc32dbg, 1222134484-78) [Globus Toolkit 4.2.0]")
        .with(fields::LRM, "pbs")
        .with(fields::SEG_OR_POLL, "0")
        .with(fields::HOSTNAME, "gatekeeper.example.org")
        .with(fields::TOTAL_JOBS, "12")
        .with(fields::CURRENT_JOBS, "3")
}

fn job_status(uuid: &str) -> UsagePacket {
    UsagePacket::new(PacketKind::JobStatus, sender(), SEND_TIME)
        .with(fields::UUID, uuid)
        .with(fields::CLIENT_ADDRESS, "198.51.100.7:50123")
        .with(fields::USER_DN, "/O=Grid/OU=Example/CN=Alice")
        .with(fields::EXECUTABLE, "/bin/hostname")
        .with(fields::ARGUMENTS, "-f")
        .with(fields::JOB_TYPE, "single")
        .with(fields::RSL_BITFIELD, "3")
        .with(fields::RSL_EXTENSIONS, "gramMyJob,savestate")
        .with(fields::COUNT, "1")
        .with(fields::DONE_TIMESTAMP, "1222134999.5")
}

struct Harness {
    store: UsageStore,
    uploader: Uploader<DnsCache>,
}

impl Harness {
    fn new() -> Self {
        let mut store = UsageStore::open_in_memory().unwrap();
        store
            .seed_rsl_attributes(&["executable".to_string(), "count".to_string()])
            .unwrap();
        Self {
            store,
            uploader: Uploader::new(DnsCache::new()).unwrap(),
        }
    }

    fn upload(&mut self, packets: &[UsagePacket]) -> gramstat_ingest::UploadReport {
        self.uploader.upload(self.store.connection(), packets).unwrap()
    }

    fn rows(&self, table: &str) -> i64 {
        self.store.row_count(table).unwrap()
    }

    fn scalar<T: rusqlite::types::FromSql>(&self, sql: &str) -> T {
        self.store
            .connection()
            .query_row(sql, [], |row| row.get(0))
            .unwrap()
    }
}

#[test]
fn job_status_resolves_each_new_dimension_once() {
    let mut h = Harness::new();
    let report = h.upload(&[job_status("jm-1")]);
    assert!(report.is_clean(), "{:?}", report.failed);

    assert_eq!(h.rows(tables::CLIENTS), 1);
    assert_eq!(h.rows(tables::EXECUTABLES), 1);
    assert_eq!(h.rows(tables::JOB_TYPES), 1);
    assert_eq!(h.rows(tables::JOBS), 1);
    assert_eq!(h.rows(tables::JOB_STATUS), 1);

    let client: i64 = h.scalar("SELECT id FROM gram5_client");
    let executable: i64 = h.scalar("SELECT id FROM gram5_executable");
    let job_type: i64 = h.scalar("SELECT id FROM gram5_job_types");
    let (job_client, job_exe, job_jt): (i64, i64, i64) = h
        .store
        .connection()
        .query_row(
            "SELECT client_id, executable_id, jobtype FROM gram5_jobs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!((job_client, job_exe, job_jt), (client, executable, job_type));

    let job_id: i64 = h.scalar("SELECT id FROM gram5_jobs");
    let status_job: i64 = h.scalar("SELECT job_id FROM gram5_job_status");
    assert_eq!(status_job, job_id);
}

#[test]
fn job_links_to_instance_announced_by_status_packet() {
    let mut h = Harness::new();
    h.upload(&[jm_status("jm-7"), job_status("jm-7")]);

    assert_eq!(h.rows(tables::JOB_MANAGER_INSTANCES), 1);
    let instance: i64 = h.scalar("SELECT id FROM gram5_job_manager_instances");
    let owner: Option<i64> = h.scalar("SELECT job_manager_id FROM gram5_job_manager_instances");
    let job_owner: i64 = h.scalar("SELECT job_manager_id FROM gram5_jobs");
    assert!(owner.is_some());
    assert_eq!(job_owner, instance);
}

#[test]
fn job_manager_status_row_carries_lifetime_and_null_counters() {
    let mut h = Harness::new();
    h.upload(&[jm_status("jm-2")]);

    let lifetime: String = h.scalar("SELECT lifetime FROM gram5_job_manager_status");
    assert_eq!(lifetime, "3600.000000 seconds");
    let total: Option<i64> = h.scalar("SELECT total_jobs FROM gram5_job_manager_status");
    let peak: Option<i64> = h.scalar("SELECT peak_jobs FROM gram5_job_manager_status");
    assert_eq!(total, Some(12));
    assert_eq!(peak, None);

    assert_eq!(h.rows(tables::VERSIONS), 1);
    assert_eq!(h.rows(tables::LRMS), 1);
    assert_eq!(h.rows(tables::JOB_MANAGERS), 1);
    assert_eq!(h.rows(tables::DNS_CACHE), 1);
}

#[test]
fn repeated_packets_reuse_dimension_rows() {
    let mut h = Harness::new();
    h.upload(&[jm_status("jm-3"), jm_status("jm-3")]);
    h.upload(&[job_status("jm-3"), job_status("jm-3")]);

    for table in [
        tables::VERSIONS,
        tables::LRMS,
        tables::JOB_MANAGERS,
        tables::JOB_MANAGER_INSTANCES,
        tables::CLIENTS,
        tables::EXECUTABLES,
        tables::JOB_TYPES,
        tables::RSL_ATTRIBUTE_GROUPS,
    ] {
        assert_eq!(h.rows(table), 1, "{table}");
    }
    assert_eq!(h.rows(tables::JOB_MANAGER_STATUS), 2);
    assert_eq!(h.rows(tables::JOBS), 2);
    // Two seeded standard attributes plus two extensions.
    assert_eq!(h.rows(tables::RSL_ATTRIBUTES), 4);
}

#[test]
fn extension_order_does_not_change_the_bitfield() {
    let mut h = Harness::new();
    h.upload(&[
        job_status("jm-4"),
        job_status("jm-4").with(fields::RSL_EXTENSIONS, "savestate, gramMyJob"),
    ]);

    assert_eq!(h.rows(tables::RSL_ATTRIBUTE_GROUPS), 1);
    let names: String = h.scalar("SELECT attributes FROM gram5_rsl_attribute_groups");
    assert_eq!(names, "count,executable,gramMyJob,savestate");
    let distinct: i64 = h.scalar("SELECT COUNT(DISTINCT rsl_bitfield) FROM gram5_jobs");
    assert_eq!(distinct, 1);
}

#[test]
fn file_staging_row_only_for_staging_jobs() {
    let mut h = Harness::new();
    h.upload(&[job_status("jm-5")]);
    assert_eq!(h.rows(tables::JOB_FILE_INFO), 0);
    let none: Option<i64> = h.scalar("SELECT gram5_job_file_info FROM gram5_jobs");
    assert_eq!(none, None);

    h.upload(&[job_status("jm-5").with("q", "1")]);
    assert_eq!(h.rows(tables::JOB_FILE_INFO), 1);
    let https: i64 = h.scalar("SELECT file_stage_in_https FROM gram5_job_file_info");
    assert_eq!(https, 1);
    let linked: i64 = h.scalar("SELECT COUNT(*) FROM gram5_jobs WHERE gram5_job_file_info IS NOT NULL");
    assert_eq!(linked, 1);
}

#[test]
fn unreached_stages_store_null() {
    let mut h = Harness::new();
    h.upload(&[job_status("jm-6")
        .with(fields::UNSUBMITTED_TIMESTAMP, "0")
        .with(fields::PENDING_TIMESTAMP, "1")]);

    let unsubmitted: Option<String> = h.scalar("SELECT unsubmitted_timestamp FROM gram5_job_status");
    let pending: Option<String> = h.scalar("SELECT pending_timestamp FROM gram5_job_status");
    let done: Option<chrono::DateTime<chrono::Utc>> =
        h.scalar("SELECT done_timestamp FROM gram5_job_status");
    assert_eq!(unsubmitted, None);
    assert_eq!(pending, None);
    assert_eq!(done.map(|ts| ts.timestamp()), Some(1_222_134_999));
}

#[test]
fn failed_packet_leaves_no_rows_and_no_cached_ids() {
    let mut h = Harness::new();
    // Fails at the last dimension, after client, executable and job type rows exist.
    let bad = job_status("jm-8").with("o", "lots");
    let report = h.upload(&[bad]);

    assert_eq!(report.inserted, 0);
    let err = &report.failed[0];
    assert_eq!(err.packet_index(), Some(0));
    assert_eq!(err.step(), Some(Step::FileStagingInfo));
    assert!(matches!(err, IngestError::Packet { kind: PacketKind::JobStatus, .. }));

    for table in [
        tables::CLIENTS,
        tables::EXECUTABLES,
        tables::JOB_TYPES,
        tables::JOB_MANAGER_INSTANCES,
        tables::DNS_CACHE,
    ] {
        assert_eq!(h.rows(table), 0, "{table}");
    }
    let stats = h.uploader.caches().stats();
    assert_eq!(stats.get(tables::EXECUTABLES), Some(0));
    assert_eq!(stats.get(tables::RSL_ATTRIBUTES), Some(2));
    assert!(h.uploader.hosts().is_empty());

    // The same dimensions resolve cleanly on the next packet.
    let report = h.upload(&[job_status("jm-8")]);
    assert!(report.is_clean(), "{:?}", report.failed);
    assert_eq!(h.rows(tables::EXECUTABLES), 1);
}

#[test]
fn caches_warm_once_and_survive_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.db");

    {
        let store = UsageStore::open(&path).unwrap();
        let mut uploader = Uploader::new(DnsCache::new()).unwrap();
        uploader.upload(store.connection(), &[jm_status("jm-9")]).unwrap();
        assert!(uploader.caches().is_loaded());
        let before = uploader.caches().stats();
        uploader.upload(store.connection(), &[jm_status("jm-9")]).unwrap();
        assert_eq!(uploader.caches().stats(), before);
    }

    let store = UsageStore::open(&path).unwrap();
    let mut uploader = Uploader::new(DnsCache::new()).unwrap();
    let report = uploader
        .upload(store.connection(), &[jm_status("jm-9"), job_status("jm-9")])
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.failed);
    assert_eq!(store.row_count(tables::JOB_MANAGER_INSTANCES).unwrap(), 1);
    assert_eq!(store.row_count(tables::JOB_MANAGERS).unwrap(), 1);
    assert_eq!(store.row_count(tables::JOB_MANAGER_STATUS).unwrap(), 3);
}

#[test]
fn extension_bits_never_alias_standard_bits_on_an_unseeded_store() {
    let store = UsageStore::open_in_memory().unwrap();
    let mut uploader = Uploader::new(DnsCache::new()).unwrap();
    let extension_only = job_status("jm-10")
        .with(fields::RSL_BITFIELD, "0")
        .with(fields::RSL_EXTENSIONS, "gramMyJob");
    let standard_only = job_status("jm-10")
        .with(fields::RSL_BITFIELD, "2")
        .with(fields::RSL_EXTENSIONS, "");

    let report = uploader
        .upload(store.connection(), &[extension_only, standard_only])
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.failed);

    let conn = store.connection();
    let mut stmt = conn.prepare("SELECT rsl_bitfield FROM gram5_jobs ORDER BY id").unwrap();
    let bitfields: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let extension_bit = num_bigint::BigUint::from(1u8) << RslAttributes::FIRST_EXTENSION_ID as usize;
    assert_eq!(bitfields, vec![extension_bit.to_string(), "2".to_string()]);

    let mut stmt = conn
        .prepare("SELECT bitfield, attributes FROM gram5_rsl_attribute_groups ORDER BY attributes")
        .unwrap();
    let groups: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        groups,
        vec![
            ("2".to_string(), String::new()),
            (extension_bit.to_string(), "gramMyJob".to_string()),
        ]
    );
}

#[test]
fn status_after_job_packet_still_records_the_job_manager() {
    let mut h = Harness::new();
    let report = h.upload(&[job_status("jm-11"), jm_status("jm-11")]);
    assert!(report.is_clean(), "{:?}", report.failed);

    assert_eq!(h.rows(tables::JOB_MANAGER_INSTANCES), 1);
    assert_eq!(h.rows(tables::JOB_MANAGERS), 1);
    assert_eq!(h.rows(tables::VERSIONS), 1);
    assert_eq!(h.rows(tables::LRMS), 1);
    let instance: i64 = h.scalar("SELECT id FROM gram5_job_manager_instances");
    let status_instance: i64 = h.scalar("SELECT job_manager_instance_id FROM gram5_job_manager_status");
    assert_eq!(status_instance, instance);
}

#[test]
fn failed_batch_commit_resets_the_caches() {
    let mut store = UsageStore::open_in_memory().unwrap();
    // A deferred foreign key that every status insert violates makes
    // COMMIT fail after all packets succeeded.
    store
        .connection()
        .execute_batch(
            "CREATE TABLE status_audit_owner (id INTEGER PRIMARY KEY);
             CREATE TABLE status_audit (
                 owner_id INTEGER REFERENCES status_audit_owner(id) DEFERRABLE INITIALLY DEFERRED
             );
             CREATE TRIGGER status_audit_orphan AFTER INSERT ON gram5_job_status
             BEGIN INSERT INTO status_audit(owner_id) VALUES (42); END;",
        )
        .unwrap();
    let mut uploader = Uploader::new(DnsCache::new()).unwrap();

    let err = uploader
        .upload_batch(store.connection_mut(), &[job_status("jm-12")])
        .unwrap_err();
    assert!(matches!(err, IngestError::Commit(_)));
    assert_eq!(store.row_count(tables::EXECUTABLES).unwrap(), 0);
    assert!(!uploader.caches().is_loaded());
    assert!(uploader.hosts().is_empty());

    store
        .connection()
        .execute_batch("DROP TRIGGER status_audit_orphan")
        .unwrap();
    let report = uploader
        .upload_batch(store.connection_mut(), &[job_status("jm-12")])
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.failed);
    assert_eq!(store.row_count(tables::EXECUTABLES).unwrap(), 1);
    assert_eq!(store.row_count(tables::JOBS).unwrap(), 1);
}
