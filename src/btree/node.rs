//! Node model and block codec
//!
//! In-memory form of one node block, plus the order/width arithmetic that
//! guarantees a full node fits in exactly one block.

use bytes::{Buf, BufMut};

use crate::error::{PlankError, Result};
use crate::storage::{FileOffset, IDX_HEADER_LEN};

use super::key::{IndexKey, IndexValue};
use super::MIN_ORDER;

/// Width of a child pointer / next-leaf pointer
const POINTER_WIDTH: usize = std::mem::size_of::<FileOffset>();

/// Kind byte + u16 slot count
const NODE_HEADER_LEN: usize = 3;

// =============================================================================
// Node Kind
// =============================================================================

/// Discriminant stored in the first byte of every block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeKind {
    /// Degenerate inner node; decoded as `Inner`, never written
    Single = 0,
    Inner = 1,
    Leaf = 2,
    /// Leaf-shaped node holding duplicate values of one key
    Overflow = 3,
}

impl NodeKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Single),
            1 => Some(Self::Inner),
            2 => Some(Self::Leaf),
            3 => Some(Self::Overflow),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Byte geometry shared by every node of one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    pub key_width: usize,
    pub value_width: usize,
    pub block_size: usize,
    /// Max children of an inner node; leaves hold at most `order - 1` keys
    pub order: usize,
}

impl NodeLayout {
    /// Largest order whose full nodes still fit in one block
    pub fn max_order(key_width: usize, value_width: usize, block_size: usize) -> usize {
        (block_size + key_width).saturating_sub(2) / (key_width + value_width + 1)
    }

    /// Build a layout, optionally with an order below the derived maximum
    pub fn new(
        key_width: usize,
        value_width: usize,
        block_size: usize,
        order: Option<usize>,
    ) -> Result<Self> {
        if key_width == 0 {
            return Err(PlankError::Config("key width must be non-zero".to_string()));
        }
        if value_width < POINTER_WIDTH {
            return Err(PlankError::Config(format!(
                "value width {} is narrower than a file offset ({})",
                value_width, POINTER_WIDTH
            )));
        }
        if block_size < IDX_HEADER_LEN as usize || block_size > u32::MAX as usize {
            return Err(PlankError::Config(format!(
                "block size {} out of range",
                block_size
            )));
        }

        let max_order = Self::max_order(key_width, value_width, block_size);
        let order = order.unwrap_or(max_order);
        if order < MIN_ORDER || order > max_order || order - 1 > u16::MAX as usize {
            return Err(PlankError::Config(format!(
                "order {} not in [{}, {}] for key width {}, value width {}, block size {}",
                order, MIN_ORDER, max_order, key_width, value_width, block_size
            )));
        }

        Ok(Self {
            key_width,
            value_width,
            block_size,
            order,
        })
    }

    /// Keys a full node holds
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Bytes an inner node uses before padding
    pub fn inner_len(&self) -> usize {
        NODE_HEADER_LEN + self.max_keys() * self.key_width + self.order * POINTER_WIDTH
    }

    /// Bytes a leaf uses before padding
    pub fn leaf_len(&self) -> usize {
        NODE_HEADER_LEN
            + self.max_keys() * (self.key_width + self.value_width + 1)
            + POINTER_WIDTH
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// What a leaf slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<V> {
    /// A stored value (a row offset for table indexes)
    Value(V),

    /// Root of the overflow chain holding every value of a duplicate key
    Overflow(FileOffset),
}

/// Routing node: `children.len() == keys.len() + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct InnerNode<K> {
    pub keys: Vec<K>,
    pub children: Vec<FileOffset>,
}

/// Leaf or overflow node: `slots.len() == keys.len()`
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode<K, V> {
    /// `Leaf` or `Overflow`
    pub kind: NodeKind,
    pub keys: Vec<K>,
    pub slots: Vec<Slot<V>>,
    /// Next leaf in key order, or next node of an overflow chain (0 = none)
    pub next_leaf: FileOffset,
}

impl<K, V> LeafNode<K, V> {
    pub fn empty() -> Self {
        Self {
            kind: NodeKind::Leaf,
            keys: Vec::new(),
            slots: Vec::new(),
            next_leaf: 0,
        }
    }

    /// New overflow node holding `values`, all under `key`
    pub fn overflow(key: K, values: Vec<V>) -> Self
    where
        K: Clone,
    {
        Self {
            kind: NodeKind::Overflow,
            keys: vec![key; values.len()],
            slots: values.into_iter().map(Slot::Value).collect(),
            next_leaf: 0,
        }
    }
}

/// One decoded node block
#[derive(Debug, Clone, PartialEq)]
pub enum Node<K, V> {
    Inner(InnerNode<K>),
    Leaf(LeafNode<K, V>),
}

impl<K: IndexKey, V: IndexValue> Node<K, V> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Inner(_) => NodeKind::Inner,
            Node::Leaf(leaf) => leaf.kind,
        }
    }

    /// Number of keys held
    pub fn slot_count(&self) -> usize {
        match self {
            Node::Inner(inner) => inner.keys.len(),
            Node::Leaf(leaf) => leaf.keys.len(),
        }
    }

    /// Encode into exactly `layout.block_size` bytes
    pub fn encode(&self, layout: &NodeLayout) -> Vec<u8> {
        let mut buf = Vec::with_capacity(layout.block_size);
        let max_keys = layout.max_keys();

        buf.put_u8(self.kind().as_byte());
        buf.put_u16_le(self.slot_count() as u16);

        match self {
            Node::Inner(inner) => {
                put_keys(&mut buf, &inner.keys, layout);
                for child in &inner.children {
                    buf.put_u64_le(*child);
                }
                buf.put_bytes(0, (layout.order - inner.children.len()) * POINTER_WIDTH);
            }
            Node::Leaf(leaf) => {
                put_keys(&mut buf, &leaf.keys, layout);
                for slot in &leaf.slots {
                    match slot {
                        Slot::Value(v) => v.encode_value(&mut buf),
                        Slot::Overflow(ptr) => {
                            buf.put_u64_le(*ptr);
                            buf.put_bytes(0, layout.value_width - POINTER_WIDTH);
                        }
                    }
                }
                buf.put_bytes(0, (max_keys - leaf.slots.len()) * layout.value_width);
                buf.put_u64_le(leaf.next_leaf);
                for slot in &leaf.slots {
                    buf.put_u8(matches!(slot, Slot::Overflow(_)) as u8);
                }
                buf.put_bytes(0, max_keys - leaf.slots.len());
            }
        }

        buf.resize(layout.block_size, 0);
        buf
    }

    /// Decode one block
    pub fn decode(block: &[u8], layout: &NodeLayout) -> Result<Self> {
        let expected = match block.first().copied().and_then(NodeKind::from_byte) {
            Some(NodeKind::Leaf) | Some(NodeKind::Overflow) => layout.leaf_len(),
            Some(_) => layout.inner_len(),
            None => {
                return Err(PlankError::Corruption(format!(
                    "unknown node kind {:?}",
                    block.first()
                )))
            }
        };
        if block.len() < expected {
            return Err(PlankError::Corruption(format!(
                "node block of {} bytes, layout needs {}",
                block.len(),
                expected
            )));
        }

        let mut buf = block;
        let kind = NodeKind::from_byte(buf.get_u8()).unwrap_or(NodeKind::Single);
        let count = buf.get_u16_le() as usize;
        let max_keys = layout.max_keys();
        if count > max_keys {
            return Err(PlankError::Corruption(format!(
                "slot count {} exceeds node capacity {}",
                count, max_keys
            )));
        }

        let keys = get_keys::<K>(&mut buf, count, layout)?;

        match kind {
            NodeKind::Leaf | NodeKind::Overflow => {
                let (values, rest) = buf.split_at(max_keys * layout.value_width);
                buf = rest;
                let next_leaf = buf.get_u64_le();
                let flags = &buf[..count];

                let slots = flags
                    .iter()
                    .enumerate()
                    .map(|(i, &flag)| {
                        let mut raw = &values[i * layout.value_width..(i + 1) * layout.value_width];
                        if flag != 0 {
                            Slot::Overflow(raw.get_u64_le())
                        } else {
                            Slot::Value(V::decode_value(&mut raw))
                        }
                    })
                    .collect();

                Ok(Node::Leaf(LeafNode {
                    kind,
                    keys,
                    slots,
                    next_leaf,
                }))
            }
            NodeKind::Inner | NodeKind::Single => {
                let children = (0..=count).map(|_| buf.get_u64_le()).collect();
                Ok(Node::Inner(InnerNode { keys, children }))
            }
        }
    }
}

fn put_keys<K: IndexKey>(buf: &mut Vec<u8>, keys: &[K], layout: &NodeLayout) {
    for key in keys {
        key.encode_key(buf, layout.key_width);
    }
    buf.put_bytes(0, (layout.max_keys() - keys.len()) * layout.key_width);
}

fn get_keys<K: IndexKey>(buf: &mut &[u8], count: usize, layout: &NodeLayout) -> Result<Vec<K>> {
    let keys = (0..count)
        .map(|_| K::decode_key(buf, layout.key_width))
        .collect::<Result<Vec<_>>>()?;
    buf.advance((layout.max_keys() - count) * layout.key_width);
    Ok(keys)
}
