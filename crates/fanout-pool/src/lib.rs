#![forbid(unsafe_code)]
//! fanout-pool: filesystem job queue, worker pool, and scatter/gather.
//!
//! Submitters and pools coordinate only through the job directory. A job
//! moves through file-extension-tagged states driven by atomic renames:
//! `.job` (submitted) to `.queue` (picked up by the scanner) to `.run`
//! (claimed by a worker) to `.done` (result persisted). The submitter owns
//! creation and deletion; exactly one worker owns the record between claim
//! and completion.

pub mod jobfile;
pub mod scatter;
pub mod worker;

pub use jobfile::StateTag;
pub use scatter::{GatherOutcome, ScatterGather};
pub use worker::WorkerPool;
