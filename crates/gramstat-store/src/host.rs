//! Host resolution.
//!
//! Packets identify hosts by address and, for job managers, a reported
//! host name. [`HostResolver`] maps that pair to a `dns_cache` id. The
//! ingest path only consumes the trait; [`DnsCache`] is the table-backed
//! implementation used by the CLI.

use rusqlite::{Connection, params};

use crate::dimension::{Dimension, DimensionCache, scan_rows};
use crate::error::StoreResult;
use crate::tables;

/// Maps an address/hostname pair to a host id.
///
/// Resolvers that insert rows must follow the same journaling contract as
/// the dimension caches: `rollback` forgets ids created since the last
/// `commit`, because the rows behind them were rolled back.
pub trait HostResolver {
    /// Prepare the resolver before the first packet.
    fn warm(&mut self, _session: &Connection) -> StoreResult<()> {
        Ok(())
    }

    fn resolve(
        &mut self,
        session: &Connection,
        address: &str,
        hostname: Option<&str>,
    ) -> StoreResult<i64>;

    fn commit(&mut self) {}

    fn rollback(&mut self) {}

    /// Forget everything, including committed ids. The next `warm`
    /// reloads from the store.
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    pub ip_address: String,
    pub hostname: Option<String>,
}

pub struct Hosts;

impl Dimension for Hosts {
    type Key = HostKey;
    const TABLE: &'static str = tables::DNS_CACHE;

    fn scan(session: &Connection) -> StoreResult<Vec<(HostKey, i64)>> {
        scan_rows(
            session,
            "SELECT id, ip_address, hostname FROM dns_cache",
            |row| {
                let key = HostKey {
                    ip_address: row.get(1)?,
                    hostname: row.get(2)?,
                };
                Ok((key, row.get(0)?))
            },
        )
    }

    fn insert(session: &Connection, key: &HostKey) -> StoreResult<i64> {
        session.execute(
            "INSERT INTO dns_cache(ip_address, hostname) VALUES (?1, ?2)",
            params![key.ip_address, key.hostname],
        )?;
        Ok(session.last_insert_rowid())
    }
}

/// `dns_cache`-backed resolver. Does no DNS lookups of its own; the
/// reported host name is taken as-is.
#[derive(Debug, Default)]
pub struct DnsCache {
    hosts: DimensionCache<Hosts>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl HostResolver for DnsCache {
    fn warm(&mut self, session: &Connection) -> StoreResult<()> {
        self.hosts.load_all(session)?;
        Ok(())
    }

    fn resolve(
        &mut self,
        session: &Connection,
        address: &str,
        hostname: Option<&str>,
    ) -> StoreResult<i64> {
        let key = HostKey {
            ip_address: address.to_string(),
            hostname: hostname.map(str::to_string),
        };
        self.hosts.get_or_create(session, &key)
    }

    fn commit(&mut self) {
        self.hosts.commit();
    }

    fn rollback(&mut self) {
        self.hosts.rollback();
    }

    fn reset(&mut self) {
        self.hosts = DimensionCache::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UsageStore;

    #[test]
    fn same_address_and_name_resolve_to_one_host() {
        let store = UsageStore::open_in_memory().unwrap();
        let mut dns = DnsCache::new();
        dns.warm(store.connection()).unwrap();

        let a = dns.resolve(store.connection(), "192.0.2.1", Some("gk.example.org")).unwrap();
        let b = dns.resolve(store.connection(), "192.0.2.1", Some("gk.example.org")).unwrap();
        let c = dns.resolve(store.connection(), "192.0.2.1", None).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.row_count("dns_cache").unwrap(), 2);
    }

    #[test]
    fn rollback_forgets_new_hosts() {
        let store = UsageStore::open_in_memory().unwrap();
        let mut dns = DnsCache::new();
        dns.warm(store.connection()).unwrap();
        dns.resolve(store.connection(), "192.0.2.9", None).unwrap();

        dns.rollback();
        assert!(dns.is_empty());
    }

    #[test]
    fn reset_reloads_committed_hosts_on_next_warm() {
        let store = UsageStore::open_in_memory().unwrap();
        let mut dns = DnsCache::new();
        dns.warm(store.connection()).unwrap();
        let id = dns.resolve(store.connection(), "192.0.2.3", None).unwrap();
        dns.commit();

        dns.reset();
        assert!(dns.is_empty());
        dns.warm(store.connection()).unwrap();
        assert_eq!(dns.resolve(store.connection(), "192.0.2.3", None).unwrap(), id);
        assert_eq!(store.row_count("dns_cache").unwrap(), 1);
    }
}
