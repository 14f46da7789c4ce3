//! Submit tagged calls as job files and gather their results into one tree.
//!
//! One coordinator instance tracks one batch: the identifiers it scattered
//! form its pending set, local mutable state with no global registry. Gather
//! polls the job directory, merges each completed result under the caller's
//! prefix plus the job's tag, concatenates captured logs, and deletes the
//! consumed files.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use fanout_core::call::{encode_with, readable_call, Call, EncodeOptions};
use fanout_core::config::PoolConfig;
use fanout_core::error::{Error, Result};
use fanout_core::hash::CallId;
use fanout_core::record::{write_atomic, JobRecord};
use fanout_tree::{Tree, TreeStore};

use crate::jobfile::{self, id_from_path, job_path, log_path, StateTag};

/// Result of a drained gather: the merged tree plus any completed jobs that
/// showed up without being requested by this coordinator.
#[derive(Debug)]
pub struct GatherOutcome {
    pub tree: Tree,
    pub anomalies: Vec<(CallId, PathBuf)>,
}

/// Scatter/gather coordinator for one function over one job directory.
pub struct ScatterGather {
    funcname: String,
    cfg: PoolConfig,
    encode_opts: EncodeOptions,
    pending: HashSet<CallId>,
}

impl ScatterGather {
    pub fn new(funcname: impl Into<String>, cfg: PoolConfig) -> Result<Self> {
        fs::create_dir_all(&cfg.job_dir)?;
        Ok(Self {
            funcname: funcname.into(),
            cfg,
            encode_opts: EncodeOptions::default(),
            pending: HashSet::new(),
        })
    }

    /// Identifiers scattered and not yet gathered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Submit one call under `tag`.
    ///
    /// A missing tag is reported loudly and drops only this call; the rest
    /// of the batch is unaffected. Stale files for the same identifier left
    /// by a previous run are removed before the fresh descriptor is staged
    /// and renamed into place.
    pub fn scatter(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        tag: Option<&str>,
    ) -> Result<CallId> {
        let call = Call {
            function: self.funcname.clone(),
            args,
            kwargs,
        };
        let id = encode_with(&call, &self.encode_opts)?;

        let Some(tag) = tag.filter(|t| !t.is_empty()) else {
            error!(call = %readable_call(&call), "need to identify an execution tag for the task");
            return Err(Error::MissingTag {
                identifier: id.to_hex(),
            });
        };

        let dir = PathBuf::from(&self.cfg.job_dir);
        for stale in [
            job_path(&dir, &id, StateTag::Job),
            job_path(&dir, &id, StateTag::Done),
            log_path(&dir, &id),
        ] {
            match fs::remove_file(&stale) {
                Ok(()) => debug!(path = %stale.display(), "removed lurking file"),
                Err(_) => {}
            }
        }

        let record = JobRecord::new(id, &call, tag);
        write_atomic(&job_path(&dir, &id, StateTag::Job), &record.to_bytes()?)?;
        self.pending.insert(id);
        debug!(id = %id, tag, "scattered");
        Ok(id)
    }

    /// Poll until every pending job completes, merging each result into one
    /// tree at `{path_prefix}/{tag}` and appending its captured log to
    /// `log_file` when given. The merged tree is written through `store` to
    /// `destination` (replacing previous output) and returned.
    ///
    /// A done file for an identifier this coordinator never scattered is
    /// reported and left in place.
    pub fn gather(
        &mut self,
        store: &dyn TreeStore,
        destination: &str,
        path_prefix: &str,
        log_file: Option<&Path>,
    ) -> Result<GatherOutcome> {
        let dir = PathBuf::from(&self.cfg.job_dir);
        let interval = Duration::from_millis(self.cfg.poll_interval_ms);

        let mut merged = Tree::empty();
        let mut logfile = match log_file {
            Some(path) => Some(File::create(path)?),
            None => None,
        };
        let mut anomalies: Vec<(CallId, PathBuf)> = Vec::new();

        while !self.pending.is_empty() {
            thread::sleep(interval);

            for done in jobfile::list_state(&dir, StateTag::Done)? {
                let Some(id) = id_from_path(&done) else {
                    continue;
                };
                if !self.pending.contains(&id) {
                    if !anomalies.iter().any(|(seen, _)| *seen == id) {
                        warn!(id = %id, path = %done.display(), "found a completed job that was not requested");
                        anomalies.push((id, done.clone()));
                    }
                    continue;
                }

                let record = JobRecord::from_bytes(&fs::read(&done)?)?;
                let Some(result) = record.result else {
                    return Err(Error::CacheCorruption {
                        identifier: id.to_hex(),
                        path: done.display().to_string(),
                        reason: "done job has no result".to_string(),
                    });
                };

                let graft = format!("{}/{}", path_prefix.trim_end_matches('/'), record.tag);
                merged.insert_subtree(&graft, result)?;

                let log = log_path(&dir, &id);
                if let Some(out) = logfile.as_mut() {
                    match fs::read_to_string(&log) {
                        Ok(text) => out.write_all(text.as_bytes())?,
                        Err(e) => warn!(id = %id, error = %e, "job log missing"),
                    }
                }

                self.pending.remove(&id);
                fs::remove_file(&done)?;
                let _ = fs::remove_file(&log);
                debug!(id = %id, tag = %record.tag, "gathered");
            }
        }

        store.write_tree(&merged, destination, "")?;
        Ok(GatherOutcome {
            tree: merged,
            anomalies,
        })
    }
}
