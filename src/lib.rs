//! # plankdb
//!
//! A minimal embedded table store with:
//! - Fixed-schema tables persisted as flat record files
//! - Disk-resident B+Tree secondary indexes (one file per indexed column)
//! - Duplicate keys kept in overflow chains
//! - Free-list reuse of index blocks and data records
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │              (catalog.bin, one Mutex per table)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Table                                │
//! │             (query routing: index or full scan)              │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │   RecordFile    │               │  BPTree (.idx)   │
//!   │     (.dat)      │               │   + NodeCache    │
//!   └────────┬────────┘               └────────┬─────────┘
//!            │                                 │
//!            └──────────────┬──────────────────┘
//!                           ▼
//!                ┌─────────────────────┐
//!                │ Free-list allocator │
//!                │   + binary codec    │
//!                └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod storage;
pub mod btree;
pub mod table;
pub mod catalog;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PlankError, Result};
pub use config::Config;
pub use database::Database;
pub use table::{DataType, RecordHandle, Schema, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of plankdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
