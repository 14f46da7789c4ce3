//! fanout CLI: run a worker pool against a shared job directory.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use fanout_core::config::PoolConfig;
use fanout_core::registry::{CallArgs, Registry};
use fanout_pool::jobfile::{list_state, StateTag};
use fanout_pool::WorkerPool;
use fanout_tree::{Array, Tree};

#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "File-system-coordinated job execution and memoization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a worker pool until the kill file appears
    Workers {
        /// Shared job directory
        #[arg(short, long)]
        job_dir: Option<String>,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory-scan poll interval in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,
    },

    /// Signal a running pool to shut down
    Kill {
        /// Shared job directory
        #[arg(short, long)]
        job_dir: Option<String>,
    },

    /// Count job files in each state
    Status {
        /// Shared job directory
        #[arg(short, long)]
        job_dir: Option<String>,
    },
}

/// Fill a tree leaf with a constant: kwargs `value` (default 0) and `rows`,
/// `cols` (default 1x1).
fn demo_fill(args: &CallArgs<'_>, out: &mut dyn Write) -> Result<Tree, String> {
    let value = args.kwarg_f64("value").unwrap_or(0.0);
    let rows = args.kwarg_f64("rows").unwrap_or(1.0) as usize;
    let cols = args.kwarg_f64("cols").unwrap_or(1.0) as usize;
    writeln!(out, "filling {rows}x{cols} with {value}").map_err(|e| e.to_string())?;

    let mut tree = Tree::empty();
    let data = Array::from_f64(&[rows, cols], vec![value; rows * cols])
        .map_err(|e| e.to_string())?;
    tree.set_leaf("/data", data).map_err(|e| e.to_string())?;
    Ok(tree)
}

/// Sum all numeric positional arguments into a scalar leaf at `/sum`.
fn demo_sum(args: &CallArgs<'_>, out: &mut dyn Write) -> Result<Tree, String> {
    let total: f64 = args.args.iter().filter_map(Value::as_f64).sum();
    writeln!(out, "sum of {} args: {total}", args.args.len()).map_err(|e| e.to_string())?;

    let mut tree = Tree::empty();
    tree.set_leaf("/sum", Array::scalar_f64(total))
        .map_err(|e| e.to_string())?;
    Ok(tree)
}

fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("demo.fill", demo_fill);
    registry.register("demo.sum", demo_sum);
    registry
}

fn apply_overrides(
    job_dir: Option<String>,
    workers: Option<usize>,
    poll_ms: Option<u64>,
) -> PoolConfig {
    let mut cfg = PoolConfig::from_env();
    if let Some(dir) = job_dir {
        cfg.job_dir = dir;
    }
    if let Some(n) = workers {
        cfg.worker_count = n;
    }
    if let Some(ms) = poll_ms {
        cfg.poll_interval_ms = ms;
    }
    cfg
}

fn run_workers(cfg: PoolConfig) -> Result<(), String> {
    let registry = Arc::new(builtin_registry());
    println!(
        "serving {} with {} workers from {}",
        registry.names().join(", "),
        cfg.worker_count,
        cfg.job_dir
    );
    let pool = WorkerPool::start(cfg, registry).map_err(|e| e.to_string())?;
    pool.run_scan_loop().map_err(|e| e.to_string())
}

fn run_kill(cfg: PoolConfig) -> Result<(), String> {
    let kill = cfg.kill_path();
    fs::write(&kill, b"").map_err(|e| e.to_string())?;
    println!("wrote {}", kill.display());
    Ok(())
}

fn run_status(cfg: PoolConfig) -> Result<(), String> {
    let dir = Path::new(&cfg.job_dir);
    for tag in [StateTag::Job, StateTag::Queue, StateTag::Run, StateTag::Done] {
        let files = list_state(dir, tag).map_err(|e| e.to_string())?;
        println!("{:>5}: {}", tag.ext(), files.len());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Workers {
            job_dir,
            workers,
            poll_ms,
        } => run_workers(apply_overrides(job_dir, workers, poll_ms)),
        Commands::Kill { job_dir } => run_kill(apply_overrides(job_dir, None, None)),
        Commands::Status { job_dir } => run_status(apply_overrides(job_dir, None, None)),
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
