//! Column indexes
//!
//! Maps a column's [`DataType`] onto the B+Tree instantiation with the
//! matching key type. Chosen once when the table opens.

use std::path::Path;

use crate::btree::{BPTree, TreeOptions};
use crate::error::{PlankError, Result};
use crate::storage::FileOffset;

use super::schema::{Column, DataType, Value};

/// B+Tree index over one column, mapping values to record offsets
pub enum ColumnIndex {
    Int32(BPTree<i32>),
    Int64(BPTree<i64>),
    Text(BPTree<String>),
}

impl ColumnIndex {
    /// Open or create the index file for `column`
    pub fn open(path: &Path, column: &Column, options: &TreeOptions) -> Result<Self> {
        Ok(match column.data_type {
            DataType::Int32 => ColumnIndex::Int32(BPTree::open(path, options)?),
            DataType::Int64 => ColumnIndex::Int64(BPTree::open(path, options)?),
            DataType::String(len) => {
                ColumnIndex::Text(BPTree::open_with_key_width(path, len, options)?)
            }
            DataType::Boolean => {
                return Err(PlankError::SchemaViolation(format!(
                    "boolean column '{}' cannot be indexed",
                    column.name
                )))
            }
        })
    }

    pub fn insert(&mut self, key: &Value, offset: FileOffset) -> Result<()> {
        match (self, key) {
            (ColumnIndex::Int32(tree), Value::Int32(k)) => tree.insert(*k, offset),
            (ColumnIndex::Int64(tree), Value::Int64(k)) => tree.insert(*k, offset),
            (ColumnIndex::Text(tree), Value::Text(k)) => tree.insert(k.clone(), offset),
            (index, key) => Err(index.mismatch(key)),
        }
    }

    /// Record offsets stored under `key`
    pub fn find(&mut self, key: &Value) -> Result<Vec<FileOffset>> {
        match (self, key) {
            (ColumnIndex::Int32(tree), Value::Int32(k)) => tree.find(k),
            (ColumnIndex::Int64(tree), Value::Int64(k)) => tree.find(k),
            (ColumnIndex::Text(tree), Value::Text(k)) => tree.find(k),
            (index, key) => Err(index.mismatch(key)),
        }
    }

    /// Record offsets stored under keys in `[first, last]`
    pub fn range_find(&mut self, first: &Value, last: &Value) -> Result<Vec<FileOffset>> {
        match (self, first, last) {
            (ColumnIndex::Int32(tree), Value::Int32(a), Value::Int32(b)) => tree.range_find(a, b),
            (ColumnIndex::Int64(tree), Value::Int64(a), Value::Int64(b)) => tree.range_find(a, b),
            (ColumnIndex::Text(tree), Value::Text(a), Value::Text(b)) => tree.range_find(a, b),
            (index, first, last) => {
                let bad = if index.accepts(first) { last } else { first };
                Err(index.mismatch(bad))
            }
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self {
            ColumnIndex::Int32(tree) => tree.flush(),
            ColumnIndex::Int64(tree) => tree.flush(),
            ColumnIndex::Text(tree) => tree.flush(),
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            ColumnIndex::Int32(tree) => tree.close(),
            ColumnIndex::Int64(tree) => tree.close(),
            ColumnIndex::Text(tree) => tree.close(),
        }
    }

    fn accepts(&self, key: &Value) -> bool {
        matches!(
            (self, key),
            (ColumnIndex::Int32(_), Value::Int32(_))
                | (ColumnIndex::Int64(_), Value::Int64(_))
                | (ColumnIndex::Text(_), Value::Text(_))
        )
    }

    fn mismatch(&self, key: &Value) -> PlankError {
        let expected = match self {
            ColumnIndex::Int32(_) => "INT32",
            ColumnIndex::Int64(_) => "INT64",
            ColumnIndex::Text(_) => "STRING",
        };
        PlankError::SchemaViolation(format!("index expects {} keys, got {:?}", expected, key))
    }
}
