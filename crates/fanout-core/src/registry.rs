//! Explicit function registry.
//!
//! Callables are registered under string keys at process start; resolving an
//! unregistered name is an `UnknownFunction` error. There is no reflective
//! lookup: a worker can only run what its process registered.

use std::collections::HashMap;
use std::io::Write;

use serde_json::Value;

use fanout_tree::Tree;

use crate::call::Call;
use crate::error::{Error, Result};
use crate::hash::CallId;

/// Arguments handed to a registered function.
pub struct CallArgs<'a> {
    pub args: &'a [Value],
    pub kwargs: &'a [(String, Value)],
}

impl CallArgs<'_> {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn kwarg_f64(&self, key: &str) -> Option<f64> {
        self.kwarg(key).and_then(Value::as_f64)
    }

    pub fn kwarg_str(&self, key: &str) -> Option<&str> {
        self.kwarg(key).and_then(Value::as_str)
    }
}

/// A job function: positional and keyword arguments in, numeric tree out.
///
/// Anything written to the sink is captured as the job's console output and
/// travels with the job record. Failures are reported as messages, not
/// panics.
pub type JobFn = fn(&CallArgs<'_>, &mut dyn Write) -> std::result::Result<Tree, String>;

/// Name-to-callable table, populated once at process start.
#[derive(Default)]
pub struct Registry {
    table: HashMap<String, JobFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: JobFn) {
        self.table.insert(name.into(), f);
    }

    pub fn resolve(&self, name: &str) -> Result<JobFn> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve and run `call`, capturing console output into `sink`.
    ///
    /// An unknown name or a function-reported failure both surface as
    /// `ExecutionFailure`-class errors carrying the identifier.
    pub fn execute(&self, id: &CallId, call: &Call, sink: &mut dyn Write) -> Result<Tree> {
        let f = self.resolve(&call.function)?;
        let args = CallArgs {
            args: &call.args,
            kwargs: &call.kwargs,
        };
        f(&args, sink).map_err(|message| Error::ExecutionFailure {
            identifier: id.to_hex(),
            message,
        })
    }
}
