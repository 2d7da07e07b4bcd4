//! Error types for plankdb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using PlankError
pub type Result<T> = std::result::Result<T, PlankError>;

/// Unified error type for plankdb operations
#[derive(Debug, Error)]
pub enum PlankError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // On-disk Format Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Catalog Errors
    // -------------------------------------------------------------------------
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    // -------------------------------------------------------------------------
    // Caller Contract Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported operation: {0}")]
    Contract(String),
}

impl From<bincode::Error> for PlankError {
    fn from(e: bincode::Error) -> Self {
        PlankError::Serialization(e.to_string())
    }
}
