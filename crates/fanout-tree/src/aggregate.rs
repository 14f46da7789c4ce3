//! Combine per-run result trees along a new leading run axis.
//!
//! Each parallel job produces a structurally-identical tree; aggregation
//! turns N trees with a leaf of shape `s` at some path into one tree with a
//! leaf of shape `(N,) + s` there, so per-run statistics can run directly on
//! the stacked arrays.

use std::collections::BTreeMap;

use tracing::warn;

use crate::array::Array;
use crate::error::{Error, Result};
use crate::tree::Tree;

/// Aggregation output: the combined tree plus every path that could not be
/// stacked into a uniform array.
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub tree: Tree,
    pub skipped: Vec<String>,
}

/// Stack `trees` along a new leading run axis.
///
/// The first tree's path set is ground truth. A path that is missing from a
/// later tree, or whose leaves disagree in shape or dtype, is reported and
/// excluded from the output; it is never dropped silently.
pub fn aggregate(trees: &[Tree]) -> Result<Aggregated> {
    if trees.is_empty() {
        return Err(Error::EmptyInput);
    }
    let num_run = trees.len();
    let flats: Vec<BTreeMap<String, Array>> = trees.iter().map(Tree::flatten).collect();

    let mut stacked: BTreeMap<String, Array> = BTreeMap::new();
    let mut skipped = Vec::new();

    'paths: for (path, first) in &flats[0] {
        let mut shape = Vec::with_capacity(first.shape().len() + 1);
        shape.push(num_run);
        shape.extend_from_slice(first.shape());
        let mut agg = Array::zeros(&shape, first.dtype());

        for (run, flat) in flats.iter().enumerate() {
            let Some(leaf) = flat.get(path) else {
                warn!(path = %path, run, "could not aggregate: path missing from run");
                skipped.push(path.clone());
                continue 'paths;
            };
            if let Err(e) = agg.write_slice(run, leaf) {
                warn!(path = %path, run, error = %e, "could not aggregate: leaf not uniform");
                skipped.push(path.clone());
                continue 'paths;
            }
        }
        stacked.insert(path.clone(), agg);
    }

    Ok(Aggregated {
        tree: Tree::unflatten(&stacked)?,
        skipped,
    })
}
