//! Table schemas and column values

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::check_padded_str;
use crate::error::{PlankError, Result};

/// Name of the synthetic primary-key column every table starts with
pub const ID_COLUMN: &str = "id";

/// Column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Int32,
    Int64,
    /// Fixed-width text; the width includes room for padding
    String(usize),
    Boolean,
}

impl DataType {
    /// Bytes the type occupies inside a record
    pub fn byte_length(self) -> usize {
        match self {
            DataType::Int32 => 4,
            DataType::Int64 => 8,
            DataType::String(len) => len,
            DataType::Boolean => 1,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int32 => write!(f, "INT32"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::String(len) => write!(f, "STRING({})", len),
            DataType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub byte_length: usize,
    /// Offset of the field from the start of the record
    pub byte_offset: usize,
    /// Backed by a B+Tree index
    pub indexed: bool,
    /// At most one row holds a given value (lets scans stop early)
    pub unique: bool,
}

/// Column layout of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    columns: Vec<Column>,
    row_length: usize,
}

impl Schema {
    /// Start a schema for table `name`
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in record order, `id` first
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Bytes per record, excluding the deleted flag
    pub fn row_length(&self) -> usize {
        self.row_length
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PlankError::ColumnNotFound {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Re-derive offsets and flags and compare them with the stored ones.
    ///
    /// Used on schemas read back from disk.
    pub fn verify(&self) -> Result<()> {
        let mut rebuilt = Schema::builder(self.name.clone());
        for column in self.columns.iter().skip(1) {
            rebuilt = rebuilt.add_column(
                column.name.clone(),
                column.data_type,
                column.indexed,
                column.unique,
            );
        }
        let rebuilt = rebuilt
            .build()
            .map_err(|e| PlankError::Corruption(format!("stored schema is invalid: {}", e)))?;

        if &rebuilt != self {
            return Err(PlankError::Corruption(format!(
                "stored schema for table '{}' has an inconsistent layout",
                self.name
            )));
        }
        Ok(())
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    columns: Vec<(String, DataType, bool, bool)>,
}

impl SchemaBuilder {
    /// Plain unindexed column
    pub fn column(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.add_column(name, data_type, false, false)
    }

    /// Column backed by a B+Tree index
    pub fn indexed_column(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.add_column(name, data_type, true, false)
    }

    pub fn add_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        indexed: bool,
        unique: bool,
    ) -> Self {
        self.columns.push((name.into(), data_type, indexed, unique));
        self
    }

    /// Validate the columns and compute the record layout.
    ///
    /// The synthetic `id` column (Int64, indexed, unique) is placed first.
    pub fn build(self) -> Result<Schema> {
        check_identifier(&self.name, "table")?;

        let mut columns = vec![Column {
            name: ID_COLUMN.to_string(),
            data_type: DataType::Int64,
            byte_length: DataType::Int64.byte_length(),
            byte_offset: 0,
            indexed: true,
            unique: true,
        }];
        let mut row_length = DataType::Int64.byte_length();
        let mut seen: HashSet<&str> = HashSet::from([ID_COLUMN]);

        for (name, data_type, indexed, unique) in &self.columns {
            check_identifier(name, "column")?;
            if !seen.insert(name.as_str()) {
                return Err(PlankError::SchemaViolation(format!(
                    "duplicate column '{}' in table '{}'",
                    name, self.name
                )));
            }
            if *data_type == DataType::String(0) {
                return Err(PlankError::SchemaViolation(format!(
                    "text column '{}' must have a non-zero length",
                    name
                )));
            }
            if *indexed && *data_type == DataType::Boolean {
                return Err(PlankError::SchemaViolation(format!(
                    "boolean column '{}' cannot be indexed",
                    name
                )));
            }

            columns.push(Column {
                name: name.clone(),
                data_type: *data_type,
                byte_length: data_type.byte_length(),
                byte_offset: row_length,
                indexed: *indexed,
                unique: *unique,
            });
            row_length += data_type.byte_length();
        }

        Ok(Schema {
            name: self.name,
            columns,
            row_length,
        })
    }
}

/// Table and column names end up in file names
fn check_identifier(name: &str, what: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PlankError::SchemaViolation(format!(
            "invalid {} name '{}' (use ASCII letters, digits and '_')",
            what, name
        )));
    }
    Ok(())
}

// =============================================================================
// Values
// =============================================================================

/// A single typed field value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Text(String),
    Boolean(bool),
}

impl Value {
    /// Check that this value can be stored in `column`
    pub fn check_column(&self, column: &Column) -> Result<()> {
        match (self, column.data_type) {
            (Value::Int32(_), DataType::Int32)
            | (Value::Int64(_), DataType::Int64)
            | (Value::Boolean(_), DataType::Boolean) => Ok(()),
            (Value::Text(text), DataType::String(len)) => check_padded_str(text, len),
            (value, expected) => Err(PlankError::SchemaViolation(format!(
                "column '{}' is {}, got {:?}",
                column.name, expected, value
            ))),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
