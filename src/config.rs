//! Configuration for plankdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::btree::TreeOptions;

/// Default size of one index block (one node per block)
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Default number of nodes a tree keeps in its cache before a full flush
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Main configuration for a plankdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── catalog.bin            (table schemas)
    ///     ├── {table}.dat            (row data)
    ///     └── {table}_{column}.idx   (one B+Tree per indexed column)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Size of one node block in every index file (bytes)
    pub block_size: usize,

    /// Max nodes held by each tree's cache before it is flushed wholesale
    pub cache_capacity: usize,

    /// Override the order derived from the block size (must not exceed it).
    /// Only useful to force splits with few keys.
    pub order: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./plankdb_data"),
            block_size: DEFAULT_BLOCK_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            order: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Tree options shared by every index opened under this config
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            block_size: self.block_size,
            cache_capacity: self.cache_capacity,
            order: self.order,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the index block size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the per-tree node cache capacity
    pub fn cache_capacity(mut self, nodes: usize) -> Self {
        self.config.cache_capacity = nodes;
        self
    }

    /// Force a smaller B+Tree order
    pub fn order(mut self, order: usize) -> Self {
        self.config.order = Some(order);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
