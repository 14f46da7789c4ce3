#![forbid(unsafe_code)]
//! fanout-tree: nested numeric result trees and run aggregation.
//!
//! Parallel jobs each produce a tree of numeric arrays; this crate holds the
//! tree data model, the flatten/unflatten walkers, the aggregator that stacks
//! structurally-identical trees along a new leading run axis, and the
//! `TreeStore` seam behind which the on-disk tree format lives.
//!
//! No job or cache logic lives here. Higher layers (`fanout-pool`,
//! `fanout-cache`) carry trees through their records and hand them back to
//! callers.

pub mod aggregate;
pub mod array;
pub mod error;
pub mod store;
pub mod tree;

pub use aggregate::{aggregate, Aggregated};
pub use array::{Array, ArrayData, Dtype};
pub use error::{Error, Result};
pub use store::{JsonTreeStore, MemoryTreeStore, TreeStore};
pub use tree::Tree;
