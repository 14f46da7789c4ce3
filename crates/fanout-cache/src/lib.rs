#![forbid(unsafe_code)]
//! fanout-cache: content-addressed persistent memoization.
//!
//! Each cached call owns three paths under the cache directory:
//! `{id}.record` (the entry), `{id}.record.busy` (computation in progress),
//! and `{id}.record.done` (entry complete and immutable). The record is
//! renamed into place before the done marker is created, so a done marker
//! always implies a fully-written record.
//!
//! The slot claim is a single exclusive file creation on the busy marker.
//! Losing the race means another process owns the computation; waiters poll
//! for the done marker with a bounded staleness timeout. Any process on any
//! machine sharing the filesystem participates in the same protocol.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use fanout_core::call::{encode, readable_call, Call};
use fanout_core::config::CacheConfig;
use fanout_core::error::{Error, Result};
use fanout_core::hash::CallId;
use fanout_core::record::{write_atomic, CacheRecord};
use fanout_core::registry::Registry;
use fanout_tree::Tree;

/// Extension of the persisted cache entry.
pub const RECORD_EXT: &str = "record";
/// Marker suffixes, appended to the record path.
pub const BUSY_SUFFIX: &str = ".busy";
pub const DONE_SUFFIX: &str = ".done";

enum Wait {
    DoneAppeared,
    BusyReleased,
}

/// A persistent memoization cache over a shared directory.
pub struct PersistentCache {
    cfg: CacheConfig,
    registry: Arc<Registry>,
}

impl PersistentCache {
    pub fn new(cfg: CacheConfig, registry: Arc<Registry>) -> Result<Self> {
        fs::create_dir_all(&cfg.cache_dir)?;
        Ok(Self { cfg, registry })
    }

    pub fn record_path(&self, id: &CallId) -> PathBuf {
        Path::new(&self.cfg.cache_dir).join(format!("{}.{}", id.to_hex(), RECORD_EXT))
    }

    fn marker(record: &Path, suffix: &str) -> PathBuf {
        let mut name = record.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Return the cached result for `call`, computing and persisting it
    /// first if no other process has.
    ///
    /// Exactly one claimant computes; everyone else reads the record once the
    /// done marker appears.
    pub fn get_or_compute(&self, call: &Call) -> Result<Tree> {
        let id = encode(call)?;
        let record = self.record_path(&id);
        let busy = Self::marker(&record, BUSY_SUFFIX);
        let done = Self::marker(&record, DONE_SUFFIX);
        debug!(call = %readable_call(call), id = %id, "cache lookup");

        loop {
            if done.exists() {
                return self.read_record(&id, &record);
            }
            match OpenOptions::new().write(true).create_new(true).open(&busy) {
                Ok(_) => {
                    // A finisher may have released between our look and our
                    // claim; re-check before computing.
                    if done.exists() {
                        let _ = fs::remove_file(&busy);
                        return self.read_record(&id, &record);
                    }
                    return self.compute(&id, call, &record, &busy, &done);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    match self.wait_for_done(&id, &busy, &done)? {
                        Wait::DoneAppeared => return self.read_record(&id, &record),
                        // The claimant released without finishing; take
                        // another pass at the claim.
                        Wait::BusyReleased => continue,
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn compute(
        &self,
        id: &CallId,
        call: &Call,
        record: &Path,
        busy: &Path,
        done: &Path,
    ) -> Result<Tree> {
        info!(id = %id, call = %readable_call(call), "no cache, recalculating");
        let started = Instant::now();

        let mut sink = Vec::new();
        let result = match self.registry.execute(id, call, &mut sink) {
            Ok(tree) => tree,
            Err(e) => {
                // Release the slot so a retry does not have to wait out the
                // staleness timeout.
                let _ = fs::remove_file(busy);
                return Err(e);
            }
        };
        if !sink.is_empty() {
            debug!(id = %id, output = %String::from_utf8_lossy(&sink), "captured output");
        }

        let entry = CacheRecord::new(*id, call, result.clone());
        write_atomic(record, &entry.to_bytes()?)?;
        fs::write(done, format!("{:.6}\n", started.elapsed().as_secs_f64()))?;
        fs::remove_file(busy)?;
        debug!(id = %id, "cached");
        Ok(result)
    }

    fn wait_for_done(&self, id: &CallId, busy: &Path, done: &Path) -> Result<Wait> {
        let started = Instant::now();
        let interval = Duration::from_millis(self.cfg.poll_interval_ms);
        let timeout = Duration::from_millis(self.cfg.busy_timeout_ms);
        info!(id = %id, "waiting for another process to finish");

        loop {
            if done.exists() {
                return Ok(Wait::DoneAppeared);
            }
            if !busy.exists() {
                warn!(id = %id, "busy marker released without a result");
                return Ok(Wait::BusyReleased);
            }
            if started.elapsed() >= timeout {
                return Err(Error::StaleLock {
                    identifier: id.to_hex(),
                    path: busy.display().to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            thread::sleep(interval);
        }
    }

    fn read_record(&self, id: &CallId, record: &Path) -> Result<Tree> {
        let corrupt = |reason: String| Error::CacheCorruption {
            identifier: id.to_hex(),
            path: record.display().to_string(),
            reason,
        };
        let bytes = fs::read(record).map_err(|e| corrupt(format!("unreadable record: {e}")))?;
        let entry = CacheRecord::from_bytes(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if entry.identifier != *id {
            return Err(corrupt(format!(
                "record names identifier {}",
                entry.identifier
            )));
        }
        debug!(id = %id, "used cached value");
        Ok(entry.result)
    }

    /// Whether a completed entry exists for `call`.
    pub fn contains(&self, call: &Call) -> Result<bool> {
        let id = encode(call)?;
        let record = self.record_path(&id);
        Ok(Self::marker(&record, DONE_SUFFIX).exists())
    }

    /// Drop the entry and markers for `call`, if present.
    pub fn evict(&self, call: &Call) -> Result<()> {
        let id = encode(call)?;
        let record = self.record_path(&id);
        for path in [
            Self::marker(&record, DONE_SUFFIX),
            Self::marker(&record, BUSY_SUFFIX),
            record,
        ] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Render one readable line per cached call.
    pub fn cache_report(&self) -> Result<Vec<String>> {
        let mut report = Vec::new();
        for entry in fs::read_dir(&self.cfg.cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            match fs::read(&path).map_err(Error::from).and_then(|bytes| {
                CacheRecord::from_bytes(&bytes)
            }) {
                Ok(record) => report.push(format!(
                    "{} -> {}",
                    readable_call(&record.call()),
                    path.display()
                )),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable cache entry"),
            }
        }
        report.sort();
        Ok(report)
    }
}
