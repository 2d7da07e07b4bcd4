//! Table
//!
//! One data file plus one index per indexed column. Every query either goes
//! through an index or falls back to a linear scan of the data file.

use std::collections::HashMap;
use std::path::Path;

use crate::btree::TreeOptions;
use crate::error::{PlankError, Result};
use crate::storage::FileOffset;

use super::index::ColumnIndex;
use super::record::RecordFile;
use super::schema::{Column, Schema, Value};

/// Points at one row of one table.
///
/// Valid until the row's slot is physically reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    pub table: String,
    pub offset: FileOffset,
}

/// An open table
pub struct Table {
    schema: Schema,
    records: RecordFile,
    /// Column name → index (indexed columns only)
    indexes: HashMap<String, ColumnIndex>,
}

impl Table {
    /// Open a table's files under `dir`, creating any that are missing
    pub fn open(dir: &Path, schema: Schema, options: &TreeOptions) -> Result<Self> {
        let records = RecordFile::open(&data_path(dir, schema.name()), schema.row_length())?;

        let mut indexes = HashMap::new();
        for column in schema.columns().iter().filter(|c| c.indexed) {
            let path = index_path(dir, schema.name(), &column.name);
            indexes.insert(column.name.clone(), ColumnIndex::open(&path, column, options)?);
        }

        tracing::debug!(
            table = schema.name(),
            columns = schema.columns().len(),
            indexes = indexes.len(),
            "opened table"
        );

        Ok(Self {
            schema,
            records,
            indexes,
        })
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Highest primary id assigned so far
    pub fn last_id(&mut self) -> Result<i64> {
        self.records.last_id()
    }

    /// Insert one row.
    ///
    /// `values` cover every column except `id`, in schema order. The row
    /// gets the next primary id and an entry in every index.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<RecordHandle> {
        let columns = &self.schema.columns()[1..];
        if values.len() != columns.len() {
            return Err(PlankError::SchemaViolation(format!(
                "table '{}' takes {} values per row, got {}",
                self.name(),
                columns.len(),
                values.len()
            )));
        }
        for (column, value) in columns.iter().zip(&values) {
            value.check_column(column)?;
        }

        let id = Value::Int64(self.records.next_id()?);
        let offset = self.records.allocate()?;

        let row: Vec<&Value> = std::iter::once(&id).chain(&values).collect();
        self.records.write_row(offset, self.schema.columns(), &row)?;

        for (column, value) in self.schema.columns().iter().zip(row) {
            if let Some(index) = self.indexes.get_mut(&column.name) {
                index.insert(value, offset)?;
            }
        }

        Ok(self.handle(offset))
    }

    /// Rows whose `column` equals `key`
    pub fn query(&mut self, column: &str, key: &Value) -> Result<Vec<RecordHandle>> {
        let column = self.schema.column(column)?.clone();
        key.check_column(&column)?;

        let offsets = match self.indexes.get_mut(&column.name) {
            Some(index) => index.find(key)?,
            None => self.records.scan(&column, key, column.unique)?,
        };
        Ok(self.handles(offsets))
    }

    /// Rows whose `column` lies in `[first, last]`, ascending by value.
    ///
    /// Only indexed columns support range queries.
    pub fn range_query(&mut self, column: &str, first: &Value, last: &Value) -> Result<Vec<RecordHandle>> {
        let column = self.schema.column(column)?;
        first.check_column(column)?;
        last.check_column(column)?;

        let index = self.indexes.get_mut(&column.name).ok_or_else(|| {
            PlankError::Contract(format!(
                "range query on unindexed column '{}.{}'",
                self.schema.name(),
                column.name
            ))
        })?;
        let offsets = index.range_find(first, last)?;
        Ok(self.handles(offsets))
    }

    /// Read one field of a row
    pub fn get(&mut self, handle: &RecordHandle, column: &str) -> Result<Value> {
        let column = self.checked(handle, column)?;
        self.records.read_field(handle.offset, &column)
    }

    /// Overwrite one field of a row in place.
    ///
    /// Indexed columns cannot be modified: their index would go stale.
    pub fn modify(&mut self, handle: &RecordHandle, column: &str, value: &Value) -> Result<()> {
        let column = self.checked(handle, column)?;
        if column.indexed {
            return Err(PlankError::Contract(format!(
                "modify on indexed column '{}.{}'",
                self.schema.name(),
                column.name
            )));
        }
        self.records.write_field(handle.offset, &column, value)
    }

    /// Flush every index cache and the data file
    pub fn flush(&mut self) -> Result<()> {
        for index in self.indexes.values_mut() {
            index.flush()?;
        }
        self.records.flush()
    }

    /// Close every index, then sync the data file
    pub fn close(mut self) -> Result<()> {
        for (_, index) in self.indexes.drain() {
            index.close()?;
        }
        self.records.sync()?;
        tracing::debug!(table = self.schema.name(), "closed table");
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn handle(&self, offset: FileOffset) -> RecordHandle {
        RecordHandle {
            table: self.schema.name().to_string(),
            offset,
        }
    }

    fn handles(&self, offsets: Vec<FileOffset>) -> Vec<RecordHandle> {
        offsets.into_iter().map(|offset| self.handle(offset)).collect()
    }

    /// Resolve `column` after checking that `handle` points into this table
    fn checked(&mut self, handle: &RecordHandle, column: &str) -> Result<Column> {
        if handle.table != self.schema.name() {
            return Err(PlankError::Contract(format!(
                "handle for table '{}' used on table '{}'",
                handle.table,
                self.schema.name()
            )));
        }
        if !self.records.is_record_offset(handle.offset)? {
            return Err(PlankError::Contract(format!(
                "offset {} is not a record of table '{}'",
                handle.offset,
                self.schema.name()
            )));
        }
        Ok(self.schema.column(column)?.clone())
    }
}

/// `<dir>/<table>.dat`
pub fn data_path(dir: &Path, table: &str) -> std::path::PathBuf {
    dir.join(format!("{}.dat", table))
}

/// `<dir>/<table>_<column>.idx`
pub fn index_path(dir: &Path, table: &str, column: &str) -> std::path::PathBuf {
    dir.join(format!("{}_{}.idx", table, column))
}
