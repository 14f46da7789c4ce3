//! Job-file naming and the on-disk state machine.
//!
//! `{job_dir}/{id}.{tag}` with tag in {job, queue, run, done}; `{id}.log`
//! holds the captured console output. Exactly one state-tagged file exists
//! per identifier outside the rename transitions. Submitters stage writes
//! under the partial suffix and rename into place, and scanners skip any
//! path carrying it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fanout_core::hash::CallId;
use fanout_core::record::PARTIAL_SUFFIX;

/// States a job file moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTag {
    /// Written by the submitter, not yet seen by a pool.
    Job,
    /// Picked up by the scanner, waiting for a worker.
    Queue,
    /// Claimed by exactly one worker.
    Run,
    /// Result and captured output persisted.
    Done,
}

impl StateTag {
    pub fn ext(self) -> &'static str {
        match self {
            StateTag::Job => "job",
            StateTag::Queue => "queue",
            StateTag::Run => "run",
            StateTag::Done => "done",
        }
    }
}

pub fn job_path(dir: &Path, id: &CallId, tag: StateTag) -> PathBuf {
    dir.join(format!("{}.{}", id.to_hex(), tag.ext()))
}

pub fn log_path(dir: &Path, id: &CallId) -> PathBuf {
    dir.join(format!("{}.log", id.to_hex()))
}

/// Recover the identifier from a state-tagged file name.
pub fn id_from_path(path: &Path) -> Option<CallId> {
    CallId::from_hex(path.file_stem()?.to_str()?)
}

/// List files in `dir` carrying `tag`, skipping in-flight partial writes.
/// A missing directory lists as empty.
pub fn list_state(dir: &Path, tag: StateTag) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut out = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.contains(PARTIAL_SUFFIX) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(tag.ext()) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
