//! gramstat-store — star-schema usage store for GRAM5 packets.
//!
//! Backed by SQLite through [rusqlite](https://docs.rs/rusqlite). Lookup
//! tables (versions, LRMs, job managers, clients, ...) are mirrored by
//! write-through [`DimensionCache`]s that are loaded once and then only
//! grow; fact tables are append-only.
//!
//! # Architecture
//!
//! - [`Dimension`] names a table, its natural key, and its scan/insert SQL.
//! - [`DimensionCache`] turns a dimension into `get_or_create`, journaling
//!   inserts so a rolled-back packet leaves no stale ids behind.
//! - [`JobManagerInstanceCache`] and [`BitfieldRegistry`] cover the two
//!   lookups that do not fit the plain key → id shape.
//! - [`HostResolver`] is the seam to host identification; [`DnsCache`]
//!   implements it over the `dns_cache` table.

pub mod bitfields;
pub mod dimension;
pub mod dimensions;
pub mod error;
pub mod facts;
pub mod host;
pub mod instances;
pub mod schema;
pub mod store;
pub mod tables;

pub use bitfields::BitfieldRegistry;
pub use dimension::{Dimension, DimensionCache};
pub use dimensions::*;
pub use error::{StoreError, StoreResult};
pub use facts::{FactRow, JobManagerStatusRow, JobRow, JobStatusRow};
pub use host::{DnsCache, HostKey, HostResolver, Hosts};
pub use instances::JobManagerInstanceCache;
pub use store::UsageStore;
