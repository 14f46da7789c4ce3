//! The tree-store seam: persist and load numeric trees under a path prefix.
//!
//! The engine only needs an abstract "store a tree under this path inside
//! that destination" capability; the actual columnar format lives behind this
//! trait. `JsonTreeStore` keeps one JSON document per destination file and is
//! the built-in backend; `MemoryTreeStore` backs tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::tree::Tree;

pub trait TreeStore {
    /// Merge `tree` into `destination` at `path_prefix`, creating the
    /// destination if needed. An empty prefix replaces the whole document.
    fn write_tree(&self, tree: &Tree, destination: &str, path_prefix: &str) -> Result<()>;

    /// Load the subtree at `path_prefix` from `source`. An empty prefix
    /// returns the whole document.
    fn read_tree(&self, source: &str, path_prefix: &str) -> Result<Tree>;
}

fn merge_at(root: Tree, tree: &Tree, path_prefix: &str) -> Result<Tree> {
    if path_prefix.split('/').all(str::is_empty) {
        return Ok(tree.clone());
    }
    let mut root = root;
    root.insert_subtree(path_prefix, tree.clone())?;
    Ok(root)
}

fn subtree_at(root: &Tree, path_prefix: &str) -> Result<Tree> {
    root.get(path_prefix)
        .cloned()
        .ok_or_else(|| Error::Path(format!("no tree at {:?}", path_prefix)))
}

/// One JSON document per destination file, written via temp file plus atomic
/// rename so readers never observe a half-written document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeStore;

impl JsonTreeStore {
    pub fn new() -> Self {
        Self
    }
}

impl TreeStore for JsonTreeStore {
    fn write_tree(&self, tree: &Tree, destination: &str, path_prefix: &str) -> Result<()> {
        let path = Path::new(destination);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::Store(format!("mkparent: {e}")))?;
            }
        }

        let root = match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("existing document at {destination}: {e}")))?,
            Err(_) => Tree::empty(),
        };
        let merged = merge_at(root, tree, path_prefix)?;

        let bytes = serde_json::to_vec(&merged)?;
        let tmp = path.with_extension("tree.partial");
        fs::write(&tmp, bytes).map_err(|e| Error::Store(format!("write: {e}")))?;
        fs::rename(&tmp, path).map_err(|e| Error::Store(format!("rename: {e}")))?;
        Ok(())
    }

    fn read_tree(&self, source: &str, path_prefix: &str) -> Result<Tree> {
        let bytes = fs::read(source).map_err(|e| Error::Store(format!("open {source}: {e}")))?;
        let root: Tree = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Store(format!("document at {source}: {e}")))?;
        if path_prefix.split('/').all(str::is_empty) {
            return Ok(root);
        }
        subtree_at(&root, path_prefix)
    }
}

/// Thread-safe in-memory tree store for tests.
#[derive(Clone, Default)]
pub struct MemoryTreeStore {
    data: Arc<Mutex<HashMap<String, Tree>>>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, destination: &str) -> bool {
        let data = self.data.lock().unwrap();
        data.contains_key(destination)
    }
}

impl TreeStore for MemoryTreeStore {
    fn write_tree(&self, tree: &Tree, destination: &str, path_prefix: &str) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let root = data.remove(destination).unwrap_or_else(Tree::empty);
        data.insert(destination.to_string(), merge_at(root, tree, path_prefix)?);
        Ok(())
    }

    fn read_tree(&self, source: &str, path_prefix: &str) -> Result<Tree> {
        let data = self.data.lock().unwrap();
        let root = data
            .get(source)
            .ok_or_else(|| Error::Store(format!("no document at {source}")))?;
        if path_prefix.split('/').all(str::is_empty) {
            return Ok(root.clone());
        }
        subtree_at(root, path_prefix)
    }
}
