//! Row-data file
//!
//! Flat file of fixed-length records behind a 16-byte header.
//!
//! ```text
//! ┌──────────────┬────────────────┬───────┬─────────────────┬───────┬─────
//! │ NextId (i64) │ FreeHead (u64) │ Flag  │ Record 1        │ Flag  │ ...
//! └──────────────┴────────────────┴───────┴─────────────────┴───────┴─────
//! 0              8                16      17 (offset of record 1)
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::BufMut;

use crate::codec::{
    encode_padded_str, read_bool_at, read_i32_at, read_i64_at, read_padded_str_at, read_u8_at,
    write_bool_at, write_bytes_at, write_i32_at, write_i64_at, write_padded_str_at,
    write_u64_at,
};
use crate::error::{PlankError, Result};
use crate::storage::{ChunkLayout, FileOffset, DAT_FREE_HEAD_POS, DAT_NEXT_ID_POS, DAT_RECORD_START};

use super::schema::{Column, DataType, Value};

/// Reader/writer for one table's `.dat` file
pub struct RecordFile {
    path: PathBuf,
    file: File,
    row_length: usize,
}

impl RecordFile {
    /// Open a data file, creating an empty one if missing
    pub fn open(path: &Path, row_length: usize) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.metadata()?.len() == 0 {
            write_i64_at(&mut file, DAT_NEXT_ID_POS, 0)?;
            write_u64_at(&mut file, DAT_FREE_HEAD_POS, 0)?;
            file.sync_all()?;
            tracing::debug!(path = %path.display(), row_length, "created data file");
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            row_length,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Distance between consecutive record offsets
    pub fn stride(&self) -> u64 {
        1 + self.row_length as u64
    }

    /// Highest id handed out so far (0 for an empty table)
    pub fn last_id(&mut self) -> Result<i64> {
        read_i64_at(&mut self.file, DAT_NEXT_ID_POS)
    }

    /// Bump and persist the primary-id counter, returning the new id
    pub fn next_id(&mut self) -> Result<i64> {
        let id = self.last_id()? + 1;
        write_i64_at(&mut self.file, DAT_NEXT_ID_POS, id)?;
        Ok(id)
    }

    /// Reserve a record slot (reused or appended) with its flag cleared
    pub fn allocate(&mut self) -> Result<FileOffset> {
        ChunkLayout::Record.consume(&mut self.file)
    }

    /// Write a whole record at `offset`; `values` are in column order
    pub fn write_row(&mut self, offset: FileOffset, columns: &[Column], values: &[&Value]) -> Result<()> {
        let mut row = Vec::with_capacity(self.row_length);
        for (column, value) in columns.iter().zip(values) {
            encode_field(&mut row, column, value)?;
        }
        if row.len() != self.row_length {
            return Err(PlankError::SchemaViolation(format!(
                "row encodes to {} bytes, expected {}",
                row.len(),
                self.row_length
            )));
        }
        write_bytes_at(&mut self.file, offset, &row)
    }

    /// Read one field of the record at `offset`
    pub fn read_field(&mut self, offset: FileOffset, column: &Column) -> Result<Value> {
        let pos = offset + column.byte_offset as u64;
        Ok(match column.data_type {
            DataType::Int32 => Value::Int32(read_i32_at(&mut self.file, pos)?),
            DataType::Int64 => Value::Int64(read_i64_at(&mut self.file, pos)?),
            DataType::Boolean => Value::Boolean(read_bool_at(&mut self.file, pos)?),
            DataType::String(len) => Value::Text(read_padded_str_at(&mut self.file, pos, len)?),
        })
    }

    /// Overwrite one field of the record at `offset`
    pub fn write_field(&mut self, offset: FileOffset, column: &Column, value: &Value) -> Result<()> {
        value.check_column(column)?;
        let pos = offset + column.byte_offset as u64;
        match (value, column.data_type) {
            (Value::Int32(v), _) => write_i32_at(&mut self.file, pos, *v),
            (Value::Int64(v), _) => write_i64_at(&mut self.file, pos, *v),
            (Value::Boolean(v), _) => write_bool_at(&mut self.file, pos, *v),
            (Value::Text(text), DataType::String(len)) => {
                write_padded_str_at(&mut self.file, pos, text, len)
            }
            (Value::Text(_), other) => Err(PlankError::SchemaViolation(format!(
                "column '{}' is {}, not text",
                column.name, other
            ))),
        }
    }

    /// True if `offset` is the start of a record currently in the file
    pub fn is_record_offset(&mut self, offset: FileOffset) -> Result<bool> {
        if offset < DAT_RECORD_START || (offset - DAT_RECORD_START) % self.stride() != 0 {
            return Ok(false);
        }
        let len = self.file.metadata()?.len();
        Ok(offset + self.row_length as u64 <= len)
    }

    /// Whether the record at `offset` sits on the free list
    pub fn is_deleted(&mut self, offset: FileOffset) -> Result<bool> {
        Ok(read_u8_at(&mut self.file, offset - 1)? != 0)
    }

    /// Linear scan for records whose `column` equals `key`.
    ///
    /// Deleted records are skipped; with `stop_at_first` the scan ends at the
    /// first match.
    pub fn scan(&mut self, column: &Column, key: &Value, stop_at_first: bool) -> Result<Vec<FileOffset>> {
        let end = self.file.metadata()?.len();
        let mut matches = Vec::new();

        let mut offset = DAT_RECORD_START;
        while offset + self.row_length as u64 <= end {
            if !self.is_deleted(offset)? && self.read_field(offset, column)? == *key {
                matches.push(offset);
                if stop_at_first {
                    break;
                }
            }
            offset += self.stride();
        }

        tracing::trace!(
            path = %self.path.display(),
            column = %column.name,
            matches = matches.len(),
            "full scan"
        );
        Ok(matches)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Append the encoding of one field to `row`
fn encode_field(row: &mut Vec<u8>, column: &Column, value: &Value) -> Result<()> {
    value.check_column(column)?;
    match value {
        Value::Int32(v) => row.put_i32_le(*v),
        Value::Int64(v) => row.put_i64_le(*v),
        Value::Boolean(v) => row.put_u8(u8::from(*v)),
        Value::Text(text) => row.put_slice(&encode_padded_str(text, column.byte_length)?),
    }
    Ok(())
}
