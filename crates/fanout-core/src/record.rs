//! Persisted job descriptors and cache entries.
//!
//! Records are explicit versioned structs, never open-ended maps, so format
//! evolution stays checkable. Readers reject records written by a newer
//! library.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fanout_tree::Tree;

use crate::call::Call;
use crate::error::{Error, Result};
use crate::hash::CallId;

/// Current record schema version.
pub const RECORD_VERSION: u16 = 1;

/// Suffix for staged writes; scanners skip any path carrying it.
pub const PARTIAL_SUFFIX: &str = ".partial";

fn check_version(version: u16) -> Result<()> {
    if version > RECORD_VERSION {
        return Err(Error::Record(format!(
            "record version {} is newer than supported {}",
            version, RECORD_VERSION
        )));
    }
    Ok(())
}

/// One unit of scattered work, persisted in the job directory.
///
/// `result` and `captured_output` stay empty until a worker completes the
/// job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub version: u16,
    pub identifier: CallId,
    pub function: String,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
    pub tag: String,
    pub result: Option<Tree>,
    pub captured_output: Option<String>,
}

impl JobRecord {
    pub fn new(identifier: CallId, call: &Call, tag: impl Into<String>) -> Self {
        Self {
            version: RECORD_VERSION,
            identifier,
            function: call.function.clone(),
            args: call.args.clone(),
            kwargs: call.kwargs.clone(),
            tag: tag.into(),
            result: None,
            captured_output: None,
        }
    }

    /// Rebuild the call this record describes.
    pub fn call(&self) -> Call {
        Call {
            function: self.function.clone(),
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: Self = serde_json::from_slice(bytes)?;
        check_version(record.version)?;
        Ok(record)
    }
}

/// A completed computation in the memoization cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: u16,
    pub identifier: CallId,
    pub function: String,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
    pub result: Tree,
}

impl CacheRecord {
    pub fn new(identifier: CallId, call: &Call, result: Tree) -> Self {
        Self {
            version: RECORD_VERSION,
            identifier,
            function: call.function.clone(),
            args: call.args.clone(),
            kwargs: call.kwargs.clone(),
            result,
        }
    }

    pub fn call(&self) -> Call {
        Call {
            function: self.function.clone(),
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: Self = serde_json::from_slice(bytes)?;
        check_version(record.version)?;
        Ok(record)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Write `bytes` under a partial name, then rename into place, so a reader
/// never observes a half-written record.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = partial_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
