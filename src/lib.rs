#![forbid(unsafe_code)]
//! fanout: file-system-coordinated job execution and memoization.
//!
//! Umbrella crate re-exporting the workspace members. Library users depend
//! on the member crates directly; this crate exists so the workspace-level
//! integration tests can exercise everything together.

pub use fanout_cache::PersistentCache;
pub use fanout_core::{
    encode, encode_with, readable_call, CacheConfig, Call, CallArgs, CallId, Error, JobFn,
    PoolConfig, Registry, Result,
};
pub use fanout_pool::{GatherOutcome, ScatterGather, WorkerPool};
pub use fanout_tree::{aggregate, Aggregated, Array, Dtype, JsonTreeStore, MemoryTreeStore, Tree,
    TreeStore};
