//! B+Tree engine
//!
//! Point lookup, range lookup and insertion over one index file.
//!
//! ## Insert State Machine
//! ```text
//! Descending ─▶ LeafInsertAttempt ─┬─▶ Done
//!                                  └─▶ SplitLeaf ─▶ PropagateSplit* ─┬─▶ AttachToExistingParent ─▶ Done
//!                                                                    └─▶ CreateNewRoot ─▶ Done
//! ```
//! `PropagateSplit` pops one offset off the recorded descent path per step,
//! so it always terminates.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::codec::{read_u32_at, read_u64_at, write_u32_at, write_u64_at};
use crate::error::{PlankError, Result};
use crate::storage::{
    ChunkLayout, FileOffset, IDX_BLOCK_SIZE_POS, IDX_FREE_HEAD_POS, IDX_KEY_SIZE_POS,
    IDX_ORDER_POS, IDX_ROOT_POS, IDX_VALUE_SIZE_POS,
};

use super::cache::{write_node, NodeCache};
use super::key::{IndexKey, IndexValue};
use super::lower_bound;
use super::node::{InnerNode, LeafNode, Node, NodeKind, NodeLayout, Slot};
use super::TreeOptions;

/// Descents deeper than this mean the child pointers form a cycle
const MAX_HEIGHT: usize = 64;

/// Outcome of trying to place a key in its leaf
enum LeafInsert {
    Done,
    /// Leaf is full and the key is new; nothing was changed
    NeedsSplit,
}

/// A disk-resident B+Tree mapping `K` to one or more `V`
pub struct BPTree<K: IndexKey, V: IndexValue = FileOffset> {
    /// Index file path (for logging)
    path: PathBuf,
    /// Index file handle, owned exclusively
    file: File,
    /// Current root block
    root: FileOffset,
    layout: NodeLayout,
    cache: NodeCache<K, V>,
}

impl<K: IndexKey, V: IndexValue> BPTree<K, V> {
    /// Open or create a tree whose key type has a fixed width
    pub fn open(path: &Path, options: &TreeOptions) -> Result<Self> {
        let key_width = K::FIXED_WIDTH.ok_or_else(|| {
            PlankError::Config("variable-width keys need an explicit key width".to_string())
        })?;
        Self::open_with_key_width(path, key_width, options)
    }

    /// Open or create a tree with keys encoded in `key_width` bytes
    ///
    /// A new file gets a header and an empty root leaf at offset
    /// `block_size`. An existing file must have been created with the same
    /// key width, value width and block size.
    pub fn open_with_key_width(path: &Path, key_width: usize, options: &TreeOptions) -> Result<Self> {
        if let Some(fixed) = K::FIXED_WIDTH {
            if fixed != key_width {
                return Err(PlankError::Config(format!(
                    "key type is {} bytes wide, not {}",
                    fixed, key_width
                )));
            }
        }
        let layout = NodeLayout::new(key_width, V::WIDTH, options.block_size, options.order)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let root = if file.metadata()?.len() == 0 {
            Self::create_empty_tree(&mut file, &layout)?;
            tracing::debug!(path = %path.display(), order = layout.order, "created index file");
            layout.block_size as FileOffset
        } else {
            Self::check_header(&mut file, &layout)?;
            read_u64_at(&mut file, IDX_ROOT_POS)?
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            root,
            layout,
            cache: NodeCache::new(layout, options.cache_capacity),
        })
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Every value stored under `key`, in insertion order (empty if absent)
    pub fn find(&mut self, key: &K) -> Result<Vec<V>> {
        let leaf_offset = self.find_leaf(key)?;

        let slot = {
            let leaf = self.load_leaf(leaf_offset)?;
            let idx = lower_bound(&leaf.keys, key);
            match leaf.keys.get(idx) {
                Some(found) if found == key => Some(leaf.slots[idx]),
                _ => None,
            }
        };

        let mut values = Vec::new();
        match slot {
            Some(Slot::Value(v)) => values.push(v),
            Some(Slot::Overflow(head)) => self.collect_overflow(head, &mut values)?,
            None => {}
        }
        Ok(values)
    }

    /// Every value stored under keys in `[first, last]`, ascending by key
    pub fn range_find(&mut self, first: &K, last: &K) -> Result<Vec<V>> {
        let mut values = Vec::new();
        if first > last {
            return Ok(values);
        }

        let mut offset = self.find_leaf(first)?;
        let mut idx = {
            let leaf = self.load_leaf(offset)?;
            lower_bound(&leaf.keys, first)
        };

        loop {
            let (slot, next_leaf) = {
                let leaf = self.load_leaf(offset)?;
                match leaf.keys.get(idx) {
                    Some(key) if key > last => break,
                    Some(_) => (Some(leaf.slots[idx]), leaf.next_leaf),
                    None => (None, leaf.next_leaf),
                }
            };

            match slot {
                Some(Slot::Value(v)) => values.push(v),
                Some(Slot::Overflow(head)) => self.collect_overflow(head, &mut values)?,
                None => {
                    // Slots exhausted: continue in the next sibling leaf
                    if next_leaf == 0 {
                        break;
                    }
                    offset = next_leaf;
                    idx = 0;
                    continue;
                }
            }
            idx += 1;
        }

        Ok(values)
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Add `value` under `key`.
    ///
    /// An existing key is never overwritten: its values grow an overflow
    /// chain, so the tree behaves as a multimap.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        key.check_width(self.layout.key_width)?;

        let mut path = self.descend(&key)?;
        let leaf_offset = path.pop().ok_or_else(|| {
            PlankError::Corruption("descent produced an empty path".to_string())
        })?;

        match self.insert_in_leaf(leaf_offset, &key, value)? {
            LeafInsert::Done => Ok(()),
            LeafInsert::NeedsSplit => {
                let (separator, right) = self.split_leaf(leaf_offset, key, value)?;
                self.insert_in_parent(path, leaf_offset, separator, right)
            }
        }
    }

    fn insert_in_leaf(&mut self, offset: FileOffset, key: &K, value: V) -> Result<LeafInsert> {
        let max_keys = self.layout.max_keys();

        let leaf = self.load_leaf(offset)?;
        let idx = lower_bound(&leaf.keys, key);
        let existing = match leaf.keys.get(idx) {
            Some(found) if found == key => Some(leaf.slots[idx]),
            _ => None,
        };

        match existing {
            None if leaf.keys.len() >= max_keys => Ok(LeafInsert::NeedsSplit),
            None => {
                leaf.keys.insert(idx, key.clone());
                leaf.slots.insert(idx, Slot::Value(value));
                Ok(LeafInsert::Done)
            }
            Some(Slot::Value(old)) => {
                // Second value for this key: move both into a new chain
                let chain = LeafNode::overflow(key.clone(), vec![old, value]);
                let chain_offset = self.allocate_block()?;
                self.cache.write(&mut self.file, chain_offset, Node::Leaf(chain))?;

                let leaf = self.load_leaf(offset)?;
                leaf.slots[idx] = Slot::Overflow(chain_offset);
                Ok(LeafInsert::Done)
            }
            Some(Slot::Overflow(head)) => {
                self.append_overflow(head, key, value)?;
                Ok(LeafInsert::Done)
            }
        }
    }

    /// Append to the last node of the chain starting at `head`
    fn append_overflow(&mut self, head: FileOffset, key: &K, value: V) -> Result<()> {
        let max_keys = self.layout.max_keys();

        let mut tail = head;
        loop {
            let next = self.load_overflow(tail)?.next_leaf;
            if next == 0 {
                break;
            }
            tail = next;
        }

        let node = self.load_overflow(tail)?;
        if node.keys.len() < max_keys {
            node.keys.push(key.clone());
            node.slots.push(Slot::Value(value));
            return Ok(());
        }

        let chained = LeafNode::overflow(key.clone(), vec![value]);
        let chained_offset = self.allocate_block()?;
        self.cache.write(&mut self.file, chained_offset, Node::Leaf(chained))?;
        self.load_overflow(tail)?.next_leaf = chained_offset;

        tracing::trace!(key = ?key, tail, chained_offset, "overflow chain grew");
        Ok(())
    }

    /// Split a full leaf while inserting `key`.
    ///
    /// Returns the separator for the parent (last key of the lower half) and
    /// the offset of the new upper leaf.
    fn split_leaf(&mut self, offset: FileOffset, key: K, value: V) -> Result<(K, FileOffset)> {
        let new_offset = self.allocate_block()?;

        let (separator, upper) = {
            let leaf = self.load_leaf(offset)?;
            let n = leaf.keys.len();
            let mid = (n - 1) / 2;
            let pos = lower_bound(&leaf.keys, &key);

            leaf.keys.insert(pos, key);
            leaf.slots.insert(pos, Slot::Value(value));

            // The half receiving the new key keeps the rounded-up share
            let lower_len = if pos <= mid { (n + 2) / 2 } else { (n + 1) / 2 };

            let upper = LeafNode {
                kind: NodeKind::Leaf,
                keys: leaf.keys.split_off(lower_len),
                slots: leaf.slots.split_off(lower_len),
                next_leaf: leaf.next_leaf,
            };
            leaf.next_leaf = new_offset;

            (leaf.keys[lower_len - 1].clone(), upper)
        };

        tracing::debug!(
            path = %self.path.display(),
            old = offset,
            new = new_offset,
            separator = ?separator,
            "split leaf"
        );

        self.cache.write(&mut self.file, new_offset, Node::Leaf(upper))?;
        Ok((separator, new_offset))
    }

    /// Hang `right` next to `left` under `separator`, splitting ancestors
    /// as long as they are full.
    ///
    /// `path` holds the ancestors of `left`, root first.
    fn insert_in_parent(
        &mut self,
        mut path: Vec<FileOffset>,
        mut left: FileOffset,
        mut separator: K,
        mut right: FileOffset,
    ) -> Result<()> {
        let max_keys = self.layout.max_keys();

        while let Some(parent) = path.pop() {
            let (pos, full) = {
                let inner = self.load_inner(parent)?;
                let pos = child_position(inner, left, parent)?;
                inner.keys.insert(pos, separator);
                inner.children.insert(pos + 1, right);
                (pos, inner.keys.len() > max_keys)
            };
            if !full {
                return Ok(());
            }

            let new_offset = self.allocate_block()?;
            let (up, upper) = {
                let inner = self.load_inner(parent)?;
                // `inner` now holds n + 1 keys; one moves up, the half
                // receiving the new key keeps the rounded-up share of the rest
                let n = max_keys;
                let mid = (n - 1) / 2;
                let lower_len = if pos <= mid { (n + 1) / 2 } else { n / 2 };
                let mut upper_keys = inner.keys.split_off(lower_len);
                let upper_children = inner.children.split_off(lower_len + 1);
                let up = upper_keys.remove(0);

                (
                    up,
                    InnerNode {
                        keys: upper_keys,
                        children: upper_children,
                    },
                )
            };

            tracing::debug!(
                path = %self.path.display(),
                old = parent,
                new = new_offset,
                separator = ?up,
                "split inner node"
            );

            self.cache.write(&mut self.file, new_offset, Node::Inner(upper))?;
            left = parent;
            separator = up;
            right = new_offset;
        }

        self.create_new_root(separator, left, right)
    }

    fn create_new_root(&mut self, separator: K, left: FileOffset, right: FileOffset) -> Result<()> {
        let root = InnerNode {
            keys: vec![separator],
            children: vec![left, right],
        };
        let offset = self.allocate_block()?;
        self.cache.write(&mut self.file, offset, Node::Inner(root))?;
        write_u64_at(&mut self.file, IDX_ROOT_POS, offset)?;
        self.root = offset;

        tracing::debug!(path = %self.path.display(), root = offset, "tree grew a level");
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Write every cached node back to disk
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush_all(&mut self.file)?;
        self.file.flush()?;
        Ok(())
    }

    /// Flush and sync, then release the file
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root_offset(&self) -> FileOffset {
        self.root
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn order(&self) -> usize {
        self.layout.order
    }

    pub fn cache(&self) -> &NodeCache<K, V> {
        &self.cache
    }

    /// Copy of the node at `offset` (through the cache)
    pub fn node(&mut self, offset: FileOffset) -> Result<Node<K, V>> {
        Ok(self.cache.load(&mut self.file, offset)?.clone())
    }

    /// Levels from root to leaf (1 for a lone root leaf)
    pub fn height(&mut self) -> Result<usize> {
        let mut height = 1;
        let mut offset = self.root;
        while let Node::Inner(inner) = self.cache.load(&mut self.file, offset)? {
            offset = inner.children[0];
            height += 1;
            if height > MAX_HEIGHT {
                return Err(PlankError::Corruption("tree deeper than limit".to_string()));
            }
        }
        Ok(height)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn create_empty_tree(file: &mut File, layout: &NodeLayout) -> Result<()> {
        write_u64_at(file, IDX_FREE_HEAD_POS, 0)?;
        write_u32_at(file, IDX_KEY_SIZE_POS, layout.key_width as u32)?;
        write_u32_at(file, IDX_VALUE_SIZE_POS, layout.value_width as u32)?;
        write_u32_at(file, IDX_BLOCK_SIZE_POS, layout.block_size as u32)?;
        write_u64_at(file, IDX_ROOT_POS, layout.block_size as FileOffset)?;
        write_u32_at(file, IDX_ORDER_POS, layout.order as u32)?;

        let root: Node<K, V> = Node::Leaf(LeafNode::empty());
        write_node(file, layout.block_size as FileOffset, &root, layout)?;
        file.sync_all()?;
        Ok(())
    }

    fn check_header(file: &mut File, layout: &NodeLayout) -> Result<()> {
        let stored = (
            read_u32_at(file, IDX_KEY_SIZE_POS)? as usize,
            read_u32_at(file, IDX_VALUE_SIZE_POS)? as usize,
            read_u32_at(file, IDX_BLOCK_SIZE_POS)? as usize,
            read_u32_at(file, IDX_ORDER_POS)? as usize,
        );
        let expected = (
            layout.key_width,
            layout.value_width,
            layout.block_size,
            layout.order,
        );
        if stored != expected {
            return Err(PlankError::Corruption(format!(
                "index header (key, value, block, order) = {:?}, expected {:?}",
                stored, expected
            )));
        }
        Ok(())
    }

    /// Next free block; the caller writes it before allocating again
    fn allocate_block(&mut self) -> Result<FileOffset> {
        ChunkLayout::Block.consume(&mut self.file)
    }

    /// Offsets from the root down to the leaf responsible for `key`
    fn descend(&mut self, key: &K) -> Result<Vec<FileOffset>> {
        let mut path = vec![self.root];
        let mut offset = self.root;

        while let Node::Inner(inner) = self.cache.load(&mut self.file, offset)? {
            let idx = lower_bound(&inner.keys, key);
            offset = inner.children[idx];
            path.push(offset);
            if path.len() > MAX_HEIGHT {
                return Err(PlankError::Corruption(format!(
                    "descent in {} exceeded {} levels",
                    self.path.display(),
                    MAX_HEIGHT
                )));
            }
        }

        Ok(path)
    }

    fn find_leaf(&mut self, key: &K) -> Result<FileOffset> {
        let path = self.descend(key)?;
        Ok(path[path.len() - 1])
    }

    /// Append every value of the chain starting at `head`
    fn collect_overflow(&mut self, head: FileOffset, values: &mut Vec<V>) -> Result<()> {
        let mut offset = head;
        loop {
            let node = self.load_overflow(offset)?;
            for slot in &node.slots {
                match slot {
                    Slot::Value(v) => values.push(*v),
                    Slot::Overflow(_) => {
                        return Err(PlankError::Corruption(format!(
                            "nested overflow pointer in chain node {}",
                            offset
                        )))
                    }
                }
            }
            if node.next_leaf == 0 {
                return Ok(());
            }
            offset = node.next_leaf;
        }
    }

    fn load_leaf(&mut self, offset: FileOffset) -> Result<&mut LeafNode<K, V>> {
        let node = self.cache.load(&mut self.file, offset)?;
        let found = node.kind();
        match node {
            Node::Leaf(leaf) if found == NodeKind::Leaf => Ok(leaf),
            _ => Err(PlankError::Corruption(format!(
                "expected leaf at {}, found {:?}",
                offset, found
            ))),
        }
    }

    fn load_overflow(&mut self, offset: FileOffset) -> Result<&mut LeafNode<K, V>> {
        let node = self.cache.load(&mut self.file, offset)?;
        let found = node.kind();
        match node {
            Node::Leaf(leaf) if found == NodeKind::Overflow => Ok(leaf),
            _ => Err(PlankError::Corruption(format!(
                "expected overflow node at {}, found {:?}",
                offset, found
            ))),
        }
    }

    fn load_inner(&mut self, offset: FileOffset) -> Result<&mut InnerNode<K>> {
        match self.cache.load(&mut self.file, offset)? {
            Node::Inner(inner) => Ok(inner),
            other => Err(PlankError::Corruption(format!(
                "expected inner node at {}, found {:?}",
                offset,
                other.kind()
            ))),
        }
    }
}

/// Index of `child` among the children of `inner`
fn child_position<K>(inner: &InnerNode<K>, child: FileOffset, parent: FileOffset) -> Result<usize> {
    inner.children.iter().position(|&c| c == child).ok_or_else(|| {
        PlankError::Corruption(format!("node {} is not a child of {}", child, parent))
    })
}

impl<K: IndexKey, V: IndexValue> Drop for BPTree<K, V> {
    fn drop(&mut self) {
        if self.cache.is_empty() {
            return;
        }
        if let Err(e) = self.cache.flush_all(&mut self.file) {
            tracing::error!(path = %self.path.display(), "failed to flush index on drop: {}", e);
        }
    }
}
