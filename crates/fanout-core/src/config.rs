//! Pool and cache configuration with environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Worker-pool and job-directory settings shared by submitters and pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Directory submitters and workers share for job files.
    pub job_dir: String,

    /// Fixed number of worker threads in a pool.
    pub worker_count: usize,

    /// Directory-scan and gather poll interval.
    pub poll_interval_ms: u64,

    /// Name of the shutdown watch file inside `job_dir`.
    pub kill_file: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            job_dir: "./jobs".to_string(),
            worker_count: 4,
            poll_interval_ms: 100,
            kill_file: "kill".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `FANOUT_JOB_DIR`: job directory
    /// - `FANOUT_WORKER_COUNT`: worker threads
    /// - `FANOUT_POLL_INTERVAL_MS`: scan/gather poll interval
    /// - `FANOUT_KILL_FILE`: shutdown watch file name
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("FANOUT_JOB_DIR") {
            cfg.job_dir = s;
        }

        if let Ok(s) = std::env::var("FANOUT_WORKER_COUNT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.worker_count = v;
            }
        }

        if let Ok(s) = std::env::var("FANOUT_POLL_INTERVAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.poll_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("FANOUT_KILL_FILE") {
            cfg.kill_file = s;
        }

        cfg
    }

    /// Full path of the shutdown watch file.
    pub fn kill_path(&self) -> PathBuf {
        Path::new(&self.job_dir).join(&self.kill_file)
    }
}

/// Memoization-cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cache records and their markers.
    pub cache_dir: String,

    /// How often a waiter re-checks for another process's done marker.
    pub poll_interval_ms: u64,

    /// How long a busy marker may block a waiter before it is declared
    /// stale.
    pub busy_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: "./cache".to_string(),
            poll_interval_ms: 1_000,
            busy_timeout_ms: 600_000,
        }
    }
}

impl CacheConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `FANOUT_CACHE_DIR`: cache directory
    /// - `FANOUT_CACHE_POLL_MS`: waiter poll interval
    /// - `FANOUT_BUSY_TIMEOUT_MS`: stale-lock threshold
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("FANOUT_CACHE_DIR") {
            cfg.cache_dir = s;
        }

        if let Ok(s) = std::env::var("FANOUT_CACHE_POLL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.poll_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("FANOUT_BUSY_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.busy_timeout_ms = v;
            }
        }

        cfg
    }
}
