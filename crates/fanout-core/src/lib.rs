#![forbid(unsafe_code)]
//! fanout-core: calls, content identifiers, records, registry, and configs.
//!
//! A call is named by the blake3 digest of its canonical encoding; every
//! persisted artifact (cache entries, job descriptors) is keyed by that
//! identifier. This crate holds the encoding, the versioned record schemas,
//! the explicit function registry, and the shared error taxonomy.
//!
//! No polling, locking, or directory scanning lives here; the cache and pool
//! crates build those protocols on top.

pub mod call;
pub mod config;
pub mod error;
pub mod hash;
pub mod record;
pub mod registry;

pub use call::{encode, encode_with, readable_call, Call, EncodeOptions};
pub use config::{CacheConfig, PoolConfig};
pub use error::{Error, Result};
pub use hash::CallId;
pub use record::{CacheRecord, JobRecord, RECORD_VERSION};
pub use registry::{CallArgs, JobFn, Registry};

/// Library version, recorded for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
