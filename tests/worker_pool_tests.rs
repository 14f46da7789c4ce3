use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use fanout_core::config::PoolConfig;
use fanout_core::registry::{CallArgs, Registry};
use fanout_pool::jobfile::{job_path, list_state, StateTag};
use fanout_pool::{ScatterGather, WorkerPool};
use fanout_tree::{Array, MemoryTreeStore, Tree};

fn steady(args: &CallArgs<'_>, out: &mut dyn Write) -> Result<Tree, String> {
    let value = args.kwarg_f64("value").unwrap_or(0.0);
    writeln!(out, "steady {value}").map_err(|e| e.to_string())?;
    let mut tree = Tree::empty();
    tree.set_leaf("/value", Array::scalar_f64(value))
        .map_err(|e| e.to_string())?;
    Ok(tree)
}

fn explode(_args: &CallArgs<'_>, out: &mut dyn Write) -> Result<Tree, String> {
    writeln!(out, "this job is doomed").map_err(|e| e.to_string())?;
    Err("synthetic fault".to_string())
}

fn pool_registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register("steady", steady);
    registry.register("explode", explode);
    Arc::new(registry)
}

fn temp_pool_config(name: &str) -> PoolConfig {
    let mut dir = std::env::temp_dir();
    dir.push(format!("fanout-pool-tests-{name}"));
    let _ = fs::remove_dir_all(&dir);
    PoolConfig {
        job_dir: dir.to_string_lossy().to_string(),
        worker_count: 2,
        poll_interval_ms: 20,
        kill_file: "kill".to_string(),
    }
}

#[test]
fn test_kill_file_shuts_the_pool_down() {
    let cfg = temp_pool_config("shutdown");
    let pool = WorkerPool::start(cfg.clone(), pool_registry()).unwrap();
    let handle = thread::spawn(move || pool.run_scan_loop());

    // give the loop a moment, then signal
    thread::sleep(Duration::from_millis(50));
    fs::write(cfg.kill_path(), b"").unwrap();

    let started = Instant::now();
    handle.join().unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!cfg.kill_path().exists());
}

#[test]
fn test_failed_job_is_orphaned_and_does_not_block_fresh_work() {
    let cfg = temp_pool_config("orphan");
    let dir = PathBuf::from(&cfg.job_dir);
    let pool = WorkerPool::start(cfg.clone(), pool_registry()).unwrap();
    let handle = thread::spawn(move || pool.run_scan_loop());

    // a job whose function fails is claimed but never reaches done
    let mut doomed = ScatterGather::new("explode", cfg.clone()).unwrap();
    let orphan_id = doomed.scatter(vec![], vec![], Some("doomed")).unwrap();

    let orphan_run = job_path(&dir, &orphan_id, StateTag::Run);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !orphan_run.exists() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(orphan_run.exists(), "failed job never reached the run state");
    assert!(!job_path(&dir, &orphan_id, StateTag::Done).exists());

    // a fresh batch through the same directory is untouched by the orphan
    let mut sg = ScatterGather::new("steady", cfg.clone()).unwrap();
    sg.scatter(vec![], vec![("value".to_string(), json!(6.0))], Some("fine"))
        .unwrap();
    let store = MemoryTreeStore::new();
    let outcome = sg.gather(&store, "results", "/out", None).unwrap();
    assert_eq!(
        outcome.tree.get("/out/fine/value").and_then(Tree::as_leaf),
        Some(&Array::scalar_f64(6.0))
    );

    // the orphan is still there for external tooling to find
    assert!(orphan_run.exists());
    assert!(!job_path(&dir, &orphan_id, StateTag::Done).exists());

    fs::write(cfg.kill_path(), b"").unwrap();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_unknown_function_does_not_kill_the_worker() {
    let cfg = temp_pool_config("unknown");
    let dir = PathBuf::from(&cfg.job_dir);
    let pool = WorkerPool::start(cfg.clone(), pool_registry()).unwrap();
    let handle = thread::spawn(move || pool.run_scan_loop());

    let mut unknown = ScatterGather::new("not_registered", cfg.clone()).unwrap();
    unknown.scatter(vec![], vec![], Some("nope")).unwrap();

    // the bad job gets claimed and abandoned
    let deadline = Instant::now() + Duration::from_secs(5);
    while list_state(&dir, StateTag::Run).unwrap().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(list_state(&dir, StateTag::Run).unwrap().len(), 1);

    // the same workers still serve good jobs afterwards
    let mut sg = ScatterGather::new("steady", cfg.clone()).unwrap();
    sg.scatter(vec![], vec![("value".to_string(), json!(2.0))], Some("ok"))
        .unwrap();
    let store = MemoryTreeStore::new();
    let outcome = sg.gather(&store, "results", "/out", None).unwrap();
    assert_eq!(
        outcome.tree.get("/out/ok/value").and_then(Tree::as_leaf),
        Some(&Array::scalar_f64(2.0))
    );

    fs::write(cfg.kill_path(), b"").unwrap();
    handle.join().unwrap().unwrap();
}
