//! gramstat-ingest — turns GRAM5 usage packets into star-schema rows.
//!
//! [`Uploader::upload`] is the entry point: it warms the
//! [`CacheRegistry`] once, then for each packet resolves every dimension
//! the packet references (creating rows on first sight) and inserts one
//! fact row. Per-packet failures are reported, not fatal.

pub mod error;
pub mod facts;
pub mod registry;
pub mod resolve;
pub mod rsl;
pub mod upload;
pub mod version;

pub use error::{IngestError, IngestResult, ResolveError, ResolveResult, Step};
pub use facts::{Fact, resolve_and_build};
pub use registry::{CacheRegistry, CacheStats};
pub use resolve::ResolveContext;
pub use upload::{UploadReport, Uploader};
pub use version::VersionParser;
