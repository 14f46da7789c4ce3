//! Fixed-size worker pool fed by a directory-scanning control loop.
//!
//! Workers block on an in-process channel; everything else is filesystem
//! state. A job that fails mid-execution is logged together with its
//! captured output and left in the `run` state; the worker moves on. Only
//! the shutdown sentinel ends a worker.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use fanout_core::config::PoolConfig;
use fanout_core::error::{Error, Result};
use fanout_core::record::{write_atomic, JobRecord};
use fanout_core::registry::Registry;

use crate::jobfile::{self, id_from_path, job_path, log_path, StateTag};

enum WorkItem {
    Job(PathBuf),
    Shutdown,
}

/// A fixed set of worker threads plus the scanning control loop.
pub struct WorkerPool {
    cfg: PoolConfig,
    tx: Sender<WorkItem>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers reading from a shared queue.
    pub fn start(cfg: PoolConfig, registry: Arc<Registry>) -> Result<Self> {
        fs::create_dir_all(&cfg.job_dir)?;
        let (tx, rx) = unbounded();

        let mut handles = Vec::with_capacity(cfg.worker_count);
        for index in 0..cfg.worker_count {
            let rx: Receiver<WorkItem> = rx.clone();
            let registry = Arc::clone(&registry);
            let handle = thread::Builder::new()
                .name(format!("fanout-worker-{index}"))
                .spawn(move || worker_loop(index, rx, registry))?;
            handles.push(handle);
        }
        info!(workers = cfg.worker_count, dir = %cfg.job_dir, "started workers");

        Ok(Self { cfg, tx, handles })
    }

    /// Feed the workers until the kill file appears, then drain and join.
    ///
    /// Each pass lists submitted `.job` files (partial writes excluded),
    /// renames them to `.queue`, and pushes them on the channel. The kill
    /// file is removed once observed.
    pub fn run_scan_loop(mut self) -> Result<()> {
        let job_dir = PathBuf::from(&self.cfg.job_dir);
        let kill = self.cfg.kill_path();
        let interval = Duration::from_millis(self.cfg.poll_interval_ms);

        loop {
            if kill.exists() {
                info!("got signal to kill job handler, exiting");
                for _ in &self.handles {
                    let _ = self.tx.send(WorkItem::Shutdown);
                }
                fs::remove_file(&kill)?;
                break;
            }

            for job in jobfile::list_state(&job_dir, StateTag::Job)? {
                let Some(id) = id_from_path(&job) else {
                    warn!(path = %job.display(), "job file name is not an identifier");
                    continue;
                };
                let queued = job_path(&job_dir, &id, StateTag::Queue);
                // A concurrent pool may have claimed it between the listing
                // and the rename.
                if let Err(e) = fs::rename(&job, &queued) {
                    debug!(id = %id, error = %e, "lost the claim on a job file");
                    continue;
                }
                debug!(id = %id, "adding to queue");
                let _ = self.tx.send(WorkItem::Job(queued));
            }

            thread::sleep(interval);
        }

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }
}

fn worker_loop(index: usize, rx: Receiver<WorkItem>, registry: Arc<Registry>) {
    loop {
        match rx.recv() {
            Ok(WorkItem::Job(path)) => {
                info!(worker = index, path = %path.display(), "starting job");
                match process_job(&path, &registry) {
                    Ok(()) => info!(worker = index, path = %path.display(), "finished job"),
                    Err(e) => {
                        warn!(worker = index, path = %path.display(), error = %e, "job abandoned")
                    }
                }
            }
            Ok(WorkItem::Shutdown) | Err(_) => {
                debug!(worker = index, "worker received shutdown request");
                return;
            }
        }
    }
}

/// Run one queued job to `done`, or leave it orphaned in `run`.
///
/// An execution failure is caught and logged with the captured output; the
/// descriptor keeps its `run` tag and the error does not propagate, so one
/// bad job never takes the worker down with it.
fn process_job(queued: &Path, registry: &Registry) -> Result<()> {
    let dir = queued
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let id = id_from_path(queued).ok_or_else(|| {
        Error::Record(format!("not a job file name: {}", queued.display()))
    })?;

    let running = job_path(&dir, &id, StateTag::Run);
    fs::rename(queued, &running)?;

    let mut record = JobRecord::from_bytes(&fs::read(&running)?)?;
    let call = record.call();

    let mut sink = Vec::new();
    let outcome = registry.execute(&id, &call, &mut sink);
    let captured = String::from_utf8_lossy(&sink).into_owned();

    match outcome {
        Ok(tree) => {
            record.result = Some(tree);
            record.captured_output = Some(captured.clone());
            write_atomic(&running, &record.to_bytes()?)?;
            fs::write(log_path(&dir, &id), captured)?;
            fs::rename(&running, job_path(&dir, &id, StateTag::Done))?;
            Ok(())
        }
        Err(e) => {
            error!(id = %id, output = %captured, error = %e, "job failed, leaving it running");
            Ok(())
        }
    }
}
