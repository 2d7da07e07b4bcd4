//! Database
//!
//! A directory of tables described by one catalog.
//!
//! ## Responsibilities
//! - Create a database from a list of schemas, or reopen an existing one
//! - Route operations to a table by name
//! - Serialize access to each table behind its own lock
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── catalog.bin
//!   ├── {table}.dat
//!   └── {table}_{column}.idx
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;

use parking_lot::{Mutex, MutexGuard};

use crate::catalog::{read_catalog, write_catalog, CATALOG_FILENAME};
use crate::config::Config;
use crate::error::{PlankError, Result};
use crate::table::{data_path, index_path, RecordHandle, Schema, Table, Value};

/// An open database
///
/// Each table sits behind its own `Mutex`, so a shared `&Database` can be
/// used from several threads while every table sees one caller at a time.
pub struct Database {
    config: Config,
    tables: HashMap<String, Mutex<Table>>,
}

impl Database {
    /// Create a new database in `config.data_dir` with the given tables
    ///
    /// Fails if the directory already holds a catalog.
    pub fn create(config: Config, schemas: Vec<Schema>) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        if config.data_dir.join(CATALOG_FILENAME).exists() {
            return Err(PlankError::Config(format!(
                "a database already exists in {}",
                config.data_dir.display()
            )));
        }

        check_file_names(&config, &schemas)?;

        // Tables first: a catalog only exists for a database that opened
        let db = Self::open_tables(config, schemas.clone())?;
        write_catalog(&db.config.data_dir, &schemas)?;
        tracing::info!(
            data_dir = %db.config.data_dir.display(),
            tables = schemas.len(),
            "created database"
        );

        Ok(db)
    }

    /// Open an existing database in `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let schemas = read_catalog(&config.data_dir)?;
        tracing::info!(
            data_dir = %config.data_dir.display(),
            tables = schemas.len(),
            "opened database"
        );

        Self::open_tables(config, schemas)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of every table, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Lock one table for direct access
    pub fn table(&self, name: &str) -> Result<MutexGuard<'_, Table>> {
        self.tables
            .get(name)
            .map(|table| table.lock())
            .ok_or_else(|| PlankError::TableNotFound(name.to_string()))
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// Insert a row; `values` exclude the `id` column
    pub fn insert(&self, table: &str, values: Vec<Value>) -> Result<RecordHandle> {
        self.table(table)?.insert(values)
    }

    pub fn query(&self, table: &str, column: &str, key: &Value) -> Result<Vec<RecordHandle>> {
        self.table(table)?.query(column, key)
    }

    pub fn range_query(
        &self,
        table: &str,
        column: &str,
        first: &Value,
        last: &Value,
    ) -> Result<Vec<RecordHandle>> {
        self.table(table)?.range_query(column, first, last)
    }

    pub fn get(&self, handle: &RecordHandle, column: &str) -> Result<Value> {
        self.table(&handle.table)?.get(handle, column)
    }

    pub fn modify(&self, handle: &RecordHandle, column: &str, value: &Value) -> Result<()> {
        self.table(&handle.table)?.modify(handle, column, value)
    }

    /// Flush every table without closing it
    pub fn flush(&self) -> Result<()> {
        for table in self.tables.values() {
            table.lock().flush()?;
        }
        Ok(())
    }

    /// Close every table, flushing index caches and syncing files
    pub fn close(self) -> Result<()> {
        let count = self.tables.len();
        for (_, table) in self.tables {
            table.into_inner().close()?;
        }
        tracing::info!(data_dir = %self.config.data_dir.display(), tables = count, "closed database");
        Ok(())
    }

    fn open_tables(config: Config, schemas: Vec<Schema>) -> Result<Self> {
        let options = config.tree_options();
        let mut tables = HashMap::with_capacity(schemas.len());
        for schema in schemas {
            let name = schema.name().to_string();
            let table = Table::open(&config.data_dir, schema, &options)?;
            tables.insert(name, Mutex::new(table));
        }
        Ok(Self { config, tables })
    }
}

/// Reject table sets whose files would share a name.
///
/// `<table>_<column>.idx` is ambiguous once names contain `_`: table `a_b`
/// column `c` and table `a` column `b_c` both map to `a_b_c.idx`.
fn check_file_names(config: &Config, schemas: &[Schema]) -> Result<()> {
    let mut tables = HashSet::new();
    let mut files = HashSet::new();

    for schema in schemas {
        if !tables.insert(schema.name()) {
            return Err(PlankError::SchemaViolation(format!(
                "duplicate table '{}'",
                schema.name()
            )));
        }
        files.insert(data_path(&config.data_dir, schema.name()));
    }

    for schema in schemas {
        for column in schema.columns().iter().filter(|c| c.indexed) {
            let path = index_path(&config.data_dir, schema.name(), &column.name);
            if !files.insert(path.clone()) {
                return Err(PlankError::SchemaViolation(format!(
                    "index of '{}.{}' would share the file {}",
                    schema.name(),
                    column.name,
                    path.display()
                )));
            }
        }
    }
    Ok(())
}
