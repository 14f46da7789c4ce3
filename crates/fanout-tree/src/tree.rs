//! Nested result trees keyed by slash-joined paths.
//!
//! A tree maps string keys to numeric-array leaves or further nodes. Flat
//! form uses paths with a leading slash, e.g. `/dir_a/data_b`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::array::Array;
use crate::error::{Error, Result};

/// A hierarchical result tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tree {
    Leaf(Array),
    Node(BTreeMap<String, Tree>),
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl Tree {
    /// An empty node.
    pub fn empty() -> Self {
        Tree::Node(BTreeMap::new())
    }

    pub fn leaf(array: Array) -> Self {
        Tree::Leaf(array)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Tree::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&Array> {
        match self {
            Tree::Leaf(a) => Some(a),
            Tree::Node(_) => None,
        }
    }

    /// Walk the tree and collect every leaf under its slash-joined path.
    pub fn flatten(&self) -> BTreeMap<String, Array> {
        let mut flat = BTreeMap::new();
        self.flatten_into("", &mut flat);
        flat
    }

    fn flatten_into(&self, prefix: &str, flat: &mut BTreeMap<String, Array>) {
        match self {
            Tree::Leaf(a) => {
                let key = if prefix.is_empty() { "/" } else { prefix };
                flat.insert(key.to_string(), a.clone());
            }
            Tree::Node(children) => {
                for (name, child) in children {
                    let path = format!("{}/{}", prefix, name);
                    child.flatten_into(&path, flat);
                }
            }
        }
    }

    /// Rebuild a nested tree from flat `path -> leaf` form.
    pub fn unflatten(flat: &BTreeMap<String, Array>) -> Result<Tree> {
        let mut root = Tree::empty();
        for (path, array) in flat {
            root.set_leaf(path, array.clone())?;
        }
        Ok(root)
    }

    /// Set a terminal leaf at `path`, creating intermediate nodes.
    pub fn set_leaf(&mut self, path: &str, array: Array) -> Result<()> {
        self.insert_subtree(path, Tree::Leaf(array))
    }

    /// Graft `sub` into the tree at `path`, creating intermediate nodes.
    ///
    /// Fails if a leaf already occupies a position along the path, or if the
    /// path is empty.
    pub fn insert_subtree(&mut self, path: &str, sub: Tree) -> Result<()> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Err(Error::Path(format!("cannot graft at empty path {:?}", path)));
        }
        let mut node = self;
        for segment in &segments[..segments.len() - 1] {
            let children = match node {
                Tree::Node(children) => children,
                Tree::Leaf(_) => {
                    return Err(Error::Path(format!(
                        "path {:?} passes through a leaf at {:?}",
                        path, segment
                    )))
                }
            };
            node = children
                .entry(segment.to_string())
                .or_insert_with(Tree::empty);
        }
        match node {
            Tree::Node(children) => {
                children.insert(segments[segments.len() - 1].to_string(), sub);
                Ok(())
            }
            Tree::Leaf(_) => Err(Error::Path(format!(
                "path {:?} passes through a leaf",
                path
            ))),
        }
    }

    /// Look up a subtree by slash path. An empty path returns the tree itself.
    pub fn get(&self, path: &str) -> Option<&Tree> {
        let mut node = self;
        for segment in split_path(path) {
            match node {
                Tree::Node(children) => node = children.get(segment)?,
                Tree::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Tree::Leaf(_) => 1,
            Tree::Node(children) => children.values().map(Tree::leaf_count).sum(),
        }
    }
}
