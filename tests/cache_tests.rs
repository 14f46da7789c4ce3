use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

use fanout_cache::PersistentCache;
use fanout_core::call::{encode, Call};
use fanout_core::config::CacheConfig;
use fanout_core::error::Error;
use fanout_core::registry::{CallArgs, Registry};
use fanout_tree::{Array, Tree};

static COUNTED_CALLS: AtomicUsize = AtomicUsize::new(0);
static RACED_CALLS: AtomicUsize = AtomicUsize::new(0);

fn counted(args: &CallArgs<'_>, _out: &mut dyn Write) -> Result<Tree, String> {
    COUNTED_CALLS.fetch_add(1, Ordering::SeqCst);
    let x = args.arg(0).and_then(Value::as_f64).unwrap_or(0.0);
    Ok(Tree::leaf(Array::scalar_f64(x + 1.0)))
}

fn raced(args: &CallArgs<'_>, _out: &mut dyn Write) -> Result<Tree, String> {
    RACED_CALLS.fetch_add(1, Ordering::SeqCst);
    // widen the window so every thread is in flight at once
    thread::sleep(Duration::from_millis(50));
    let x = args.arg(0).and_then(Value::as_f64).unwrap_or(0.0);
    Ok(Tree::leaf(Array::scalar_f64(x * 2.0)))
}

fn boom(_args: &CallArgs<'_>, out: &mut dyn Write) -> Result<Tree, String> {
    writeln!(out, "about to fail").map_err(|e| e.to_string())?;
    Err("deliberate failure".to_string())
}

fn test_registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register("counted", counted);
    registry.register("raced", raced);
    registry.register("boom", boom);
    Arc::new(registry)
}

fn temp_cache_config(name: &str) -> CacheConfig {
    let mut dir = std::env::temp_dir();
    dir.push(format!("fanout-cache-tests-{name}"));
    let _ = fs::remove_dir_all(&dir);
    CacheConfig {
        cache_dir: dir.to_string_lossy().to_string(),
        poll_interval_ms: 10,
        busy_timeout_ms: 5_000,
    }
}

#[test]
fn test_get_or_compute_runs_the_function_once() {
    let cache = PersistentCache::new(temp_cache_config("idempotent"), test_registry()).unwrap();
    let call = Call::new("counted").arg(41.0);

    let before = COUNTED_CALLS.load(Ordering::SeqCst);
    let first = cache.get_or_compute(&call).unwrap();
    let second = cache.get_or_compute(&call).unwrap();

    assert_eq!(first, Tree::leaf(Array::scalar_f64(42.0)));
    assert_eq!(first, second);
    assert_eq!(COUNTED_CALLS.load(Ordering::SeqCst) - before, 1);
    assert!(cache.contains(&call).unwrap());
}

#[test]
fn test_concurrent_callers_share_one_computation() {
    let cfg = temp_cache_config("race");
    let registry = test_registry();
    let call = Call::new("raced").arg(21.0);

    let before = RACED_CALLS.load(Ordering::SeqCst);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cfg = cfg.clone();
        let registry = Arc::clone(&registry);
        let call = call.clone();
        handles.push(thread::spawn(move || {
            let cache = PersistentCache::new(cfg, registry).unwrap();
            cache.get_or_compute(&call).unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Tree::leaf(Array::scalar_f64(42.0)));
    }

    // the exclusive busy claim admits exactly one computation
    assert_eq!(RACED_CALLS.load(Ordering::SeqCst) - before, 1);

    // and the done marker points at a well-formed record
    let cache = PersistentCache::new(cfg, test_registry()).unwrap();
    assert!(cache.contains(&call).unwrap());
    assert_eq!(
        cache.get_or_compute(&call).unwrap(),
        Tree::leaf(Array::scalar_f64(42.0))
    );
}

#[test]
fn test_done_marker_with_bad_record_is_corruption() {
    let cfg = temp_cache_config("corrupt");
    let cache = PersistentCache::new(cfg, test_registry()).unwrap();
    let call = Call::new("counted").arg(7.0);
    let id = encode(&call).unwrap();

    let record = cache.record_path(&id);
    fs::write(&record, b"{ not json").unwrap();
    fs::write(PathBuf::from(format!("{}.done", record.display())), b"").unwrap();

    match cache.get_or_compute(&call).unwrap_err() {
        Error::CacheCorruption { identifier, .. } => assert_eq!(identifier, id.to_hex()),
        other => panic!("expected corruption, got {other}"),
    }
}

#[test]
fn test_unyielding_busy_marker_is_a_stale_lock() {
    let mut cfg = temp_cache_config("stale");
    cfg.busy_timeout_ms = 100;
    let cache = PersistentCache::new(cfg, test_registry()).unwrap();
    let call = Call::new("counted").arg(9.0);
    let id = encode(&call).unwrap();

    let busy = PathBuf::from(format!("{}.busy", cache.record_path(&id).display()));
    fs::write(&busy, b"working").unwrap();

    match cache.get_or_compute(&call).unwrap_err() {
        Error::StaleLock {
            identifier,
            waited_ms,
            ..
        } => {
            assert_eq!(identifier, id.to_hex());
            assert!(waited_ms >= 100);
        }
        other => panic!("expected stale lock, got {other}"),
    }
}

#[test]
fn test_released_busy_marker_reopens_the_claim() {
    let cfg = temp_cache_config("release");
    let cache = PersistentCache::new(cfg, test_registry()).unwrap();
    let call = Call::new("counted").arg(100.0);
    let id = encode(&call).unwrap();

    let busy = PathBuf::from(format!("{}.busy", cache.record_path(&id).display()));
    fs::write(&busy, b"working").unwrap();

    let releaser = {
        let busy = busy.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            fs::remove_file(busy).unwrap();
        })
    };

    // the waiter sees the release, claims the slot itself, and computes
    assert_eq!(
        cache.get_or_compute(&call).unwrap(),
        Tree::leaf(Array::scalar_f64(101.0))
    );
    releaser.join().unwrap();
}

#[test]
fn test_execution_failure_releases_the_slot() {
    let cfg = temp_cache_config("failure");
    let cache = PersistentCache::new(cfg, test_registry()).unwrap();
    let call = Call::new("boom");

    for _ in 0..2 {
        // a retry fails the same way instead of waiting out a stale lock
        match cache.get_or_compute(&call).unwrap_err() {
            Error::ExecutionFailure { message, .. } => {
                assert!(message.contains("deliberate failure"))
            }
            other => panic!("expected execution failure, got {other}"),
        }
    }
    assert!(!cache.contains(&call).unwrap());
}

#[test]
fn test_evict_and_report() {
    let cfg = temp_cache_config("report");
    let cache = PersistentCache::new(cfg, test_registry()).unwrap();
    let call = Call::new("counted").arg(1.0).kwarg("note", "kept");

    cache.get_or_compute(&call).unwrap();
    let report = cache.cache_report().unwrap();
    assert_eq!(report.len(), 1);
    assert!(report[0].contains("counted(1.0, note=\"kept\")") || report[0].contains("counted(1"));

    cache.evict(&call).unwrap();
    assert!(!cache.contains(&call).unwrap());
    assert!(cache.cache_report().unwrap().is_empty());
}
