//! Canonical call encoding.
//!
//! A call is a function name plus positional and keyword arguments. Keyword
//! pairs are sorted by key before hashing, so insertion order never affects
//! the identifier. Nested JSON objects inside argument *values* are hashed as
//! serialized; callers who need order-insensitive nested maps must
//! canonicalize them before building the call.

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::hash::{digest_bytes, CallId};

/// An immutable function call: name, positional args, keyword args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub function: String,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl Call {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.push((key.into(), value.into()));
        self
    }
}

/// Encoding knobs.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Keyword argument whose string value names a config file. The file's
    /// full text is substituted into the hashed representation, so two calls
    /// naming different paths with identical content share an identifier.
    pub config_file_key: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            config_file_key: "config_file".to_string(),
        }
    }
}

/// Compute the content identifier of a call with default options.
pub fn encode(call: &Call) -> Result<CallId> {
    encode_with(call, &EncodeOptions::default())
}

/// Compute the content identifier of a call.
///
/// The keyword list is copied before sorting and substitution, so the
/// caller's `Call` is never mutated.
pub fn encode_with(call: &Call, opts: &EncodeOptions) -> Result<CallId> {
    let mut kwargs = call.kwargs.clone();
    for (key, value) in kwargs.iter_mut() {
        if *key == opts.config_file_key {
            if let Value::String(path) = value {
                let text = fs::read_to_string(path.as_str())
                    .map_err(|e| Error::Encoding(format!("config file {path:?}: {e}")))?;
                *value = Value::String(text);
            }
        }
    }
    kwargs.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical = serde_json::to_vec(&(&call.function, &call.args, &kwargs))
        .map_err(|e| Error::Encoding(e.to_string()))?;
    Ok(digest_bytes(&canonical))
}

const MAX_ARG_REPR: usize = 64;

fn short_repr(value: &Value) -> String {
    let s = value.to_string();
    if s.len() > MAX_ARG_REPR {
        "BIG_ARG".to_string()
    } else {
        s
    }
}

/// Render `func(arg, key=value)` for log lines, eliding long arguments.
pub fn readable_call(call: &Call) -> String {
    let rendered: Vec<String> = call
        .args
        .iter()
        .map(short_repr)
        .chain(
            call.kwargs
                .iter()
                .map(|(k, v)| format!("{}={}", k, short_repr(v))),
        )
        .collect();
    format!("{}({})", call.function, rendered.join(", "))
}
