//! B+Tree Module
//!
//! Disk-resident B+Tree used for every secondary index.
//!
//! ## Responsibilities
//! - Point lookup and inclusive range lookup
//! - Insertion with leaf/inner splits and root growth
//! - Duplicate keys kept in overflow chains (multiset semantics)
//! - Bounded write-back cache of decoded nodes
//!
//! ## Node Block Format
//! ```text
//! ┌──────────┬───────────┬───────────────────────────────────────────────┐
//! │ Kind (1) │ Slots (2) │ Keys: (order - 1) × key_width                 │
//! ├──────────┴───────────┴───────────────────────────────────────────────┤
//! │ Inner:          Children: order × 8                                  │
//! │ Leaf/Overflow:  Values: (order - 1) × value_width                    │
//! │                 NextLeaf: 8                                          │
//! │                 Flags: (order - 1) × 1   (1 = value is chain root)   │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │ Zero padding up to block_size                                        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tree Shape
//! ```text
//!                    ┌──────────────┐
//!                    │ Inner [20]   │   lower_bound routing:
//!                    └──┬────────┬──┘   key <= 20 → left, key > 20 → right
//!            ┌──────────┘        └──────────┐
//!     ┌──────▼──────┐              ┌────────▼─────┐
//!     │ Leaf 5 12 20│ ──next_leaf─▶│ Leaf 31 47   │ ──▶ 0
//!     └─────────────┘              └────────┬─────┘
//!                                           │ 47 flagged
//!                                  ┌────────▼─────┐     ┌──────────────┐
//!                                  │ Overflow 47× │ ──▶ │ Overflow 47× │
//!                                  └──────────────┘     └──────────────┘
//! ```

mod cache;
mod key;
mod node;
mod tree;

pub use cache::NodeCache;
pub use key::{IndexKey, IndexValue};
pub use node::{InnerNode, LeafNode, Node, NodeKind, NodeLayout, Slot};
pub use tree::BPTree;

use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_CAPACITY};

/// Smallest order a tree accepts (every split leaves both halves non-empty)
pub const MIN_ORDER: usize = 4;

/// Options for opening one B+Tree
#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    /// Bytes per node block
    pub block_size: usize,

    /// Nodes kept in the cache before a whole-cache flush
    pub cache_capacity: usize,

    /// Optional order smaller than the one derived from the block size
    pub order: Option<usize>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            order: None,
        }
    }
}

/// Position of the first key `>= key` (or `keys.len()`)
pub(crate) fn lower_bound<K: Ord>(keys: &[K], key: &K) -> usize {
    keys.partition_point(|k| k < key)
}
