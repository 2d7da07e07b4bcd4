//! Table Module
//!
//! Fixed-schema tables: a flat row-data file plus one B+Tree per indexed
//! column.
//!
//! ## Query Routing
//! ```text
//!   query(column, key)
//!         │
//!         ├── indexed ──▶ BPTree::find ──▶ record offsets
//!         │
//!         └── unindexed ─▶ scan data file (stop at first hit if unique)
//!
//!   range_query(column, first, last)
//!         │
//!         ├── indexed ──▶ BPTree::range_find
//!         └── unindexed ─▶ Contract error
//! ```

mod index;
mod record;
mod schema;
#[allow(clippy::module_inception)]
mod table;

pub use index::ColumnIndex;
pub use record::RecordFile;
pub use schema::{Column, DataType, Schema, SchemaBuilder, Value, ID_COLUMN};
pub use table::{data_path, index_path, RecordHandle, Table};
