//! Node cache
//!
//! Bounded write-back map from block offset to decoded node.
//!
//! ## Ownership
//! The cache is the only owner of a loaded node. Callers hold offsets and
//! borrow the node through [`NodeCache::load`] for as long as they need it;
//! the borrow checker keeps a borrowed node from outliving a flush.
//!
//! ## Eviction
//! When a load would grow the cache past its capacity, every resident node
//! is written back and the cache is cleared before the new node goes in.
//! This whole-cache flush is simple and always correct, but it throws away
//! hot inner nodes along with cold leaves; an LRU/CLOCK policy would do
//! better under a large working set.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{PlankError, Result};
use crate::storage::FileOffset;

use super::key::{IndexKey, IndexValue};
use super::node::{Node, NodeLayout};

/// Write-back node cache for one index file
pub struct NodeCache<K, V> {
    /// Resident nodes, possibly modified since they were read
    nodes: HashMap<FileOffset, Node<K, V>>,
    /// Max resident nodes before a whole-cache flush
    capacity: usize,
    layout: NodeLayout,
    /// Number of whole-cache flushes so far
    flushes: u64,
}

impl<K: IndexKey, V: IndexValue> NodeCache<K, V> {
    pub fn new(layout: NodeLayout, capacity: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            capacity,
            layout,
            flushes: 0,
        }
    }

    /// Borrow the node at `offset`, reading it from disk if not resident
    pub fn load(&mut self, file: &mut File, offset: FileOffset) -> Result<&mut Node<K, V>> {
        if !self.nodes.contains_key(&offset) {
            if self.nodes.len() >= self.capacity {
                tracing::debug!(resident = self.nodes.len(), "node cache full, flushing");
                self.flush_all(file)?;
                self.flushes += 1;
            }
            let node = read_node(file, offset, &self.layout)?;
            self.nodes.insert(offset, node);
        }

        self.nodes.get_mut(&offset).ok_or_else(|| {
            PlankError::Corruption(format!("node at {} vanished from cache", offset))
        })
    }

    /// Store `node` at `offset`.
    ///
    /// A resident node is replaced in memory and reaches the disk on the next
    /// flush; anything else is written through immediately.
    pub fn write(&mut self, file: &mut File, offset: FileOffset, node: Node<K, V>) -> Result<()> {
        match self.nodes.get_mut(&offset) {
            Some(resident) => {
                *resident = node;
                Ok(())
            }
            None => write_node(file, offset, &node, &self.layout),
        }
    }

    /// Write every resident node back and empty the cache
    pub fn flush_all(&mut self, file: &mut File) -> Result<()> {
        // Ascending offsets keep the writes sequential
        let mut resident: Vec<_> = self.nodes.iter().collect();
        resident.sort_unstable_by_key(|(offset, _)| **offset);

        for (offset, node) in resident {
            write_node(file, *offset, node, &self.layout)?;
        }
        self.nodes.clear();

        Ok(())
    }

    pub fn contains(&self, offset: FileOffset) -> bool {
        self.nodes.contains_key(&offset)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whole-cache flushes triggered by loads
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }
}

/// Read and decode the block at `offset`, bypassing any cache
pub(crate) fn read_node<K: IndexKey, V: IndexValue>(
    file: &mut File,
    offset: FileOffset,
    layout: &NodeLayout,
) -> Result<Node<K, V>> {
    let mut block = vec![0u8; layout.block_size];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut block)?;
    Node::decode(&block, layout)
}

/// Encode and write `node` as one full block at `offset`
pub(crate) fn write_node<K: IndexKey, V: IndexValue>(
    file: &mut File,
    offset: FileOffset,
    node: &Node<K, V>,
    layout: &NodeLayout,
) -> Result<()> {
    let block = node.encode(layout);
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&block)?;
    Ok(())
}
