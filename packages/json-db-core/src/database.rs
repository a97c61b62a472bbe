//! Database handle owning one table engine per schema entry.

use std::collections::HashMap;

use crate::config::DbConfig;
use crate::error::DbError;
use crate::persistence::{validate_schema, SchemaFile};
use crate::table::{
    resolve_relationships, DeleteRequest, Event, EventKind, ListenerId, Query, Row, Table,
    UpdateRequest,
};

/// Resolves a table name to its engine. Used by `Extend` to reach sibling tables.
pub trait TableLookup {
    fn lookup(&self, name: &str) -> Option<&Table>;
}

impl TableLookup for HashMap<String, Table> {
    fn lookup(&self, name: &str) -> Option<&Table> {
        self.get(name)
    }
}

/// Database container holding every table of one data directory.
#[derive(Debug)]
pub struct Database {
    config: DbConfig,
    schema: SchemaFile,
    /// Map of table name to table instance
    tables: HashMap<String, Table>,
}

impl Database {
    /// Opens the database under `config.data_dir`.
    ///
    /// Reads `schema.json` and hydrates every table from its file. A missing
    /// schema document yields an empty database.
    pub fn open(config: DbConfig) -> Result<Self, DbError> {
        let schema_path = config.schema_path();
        let schema = if schema_path.exists() {
            SchemaFile::load(&schema_path)?
        } else {
            SchemaFile::new(Default::default())
        };
        Self::from_schema(config, schema)
    }

    /// Creates a database from `schema`, writing the schema document first.
    ///
    /// Existing table files under the data directory are loaded.
    pub fn create(config: DbConfig, schema: SchemaFile) -> Result<Self, DbError> {
        validate_schema(&schema)?;
        schema.save(&config.schema_path())?;
        Self::from_schema(config, schema)
    }

    fn from_schema(config: DbConfig, schema: SchemaFile) -> Result<Self, DbError> {
        let mut tables = HashMap::with_capacity(schema.tables.len());
        for (name, table_schema) in &schema.tables {
            let relationships = resolve_relationships(name, &schema.tables);
            let table = Table::load(name.clone(), table_schema.clone(), relationships, &config)?;
            tables.insert(name.clone(), table);
        }
        tracing::info!(
            "Opened database at {} with {} tables",
            config.data_dir.display(),
            tables.len()
        );
        Ok(Self {
            config,
            schema,
            tables,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaFile {
        &self.schema
    }

    /// Gets a table by name.
    pub fn table(&self, name: &str) -> Result<&Table, DbError> {
        self.tables.get(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })
    }

    /// Gets a mutable table by name.
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table, DbError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Returns all table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn get(&self, table: &str, query: &Query) -> Result<Vec<Row>, DbError> {
        self.table(table)?.get(query, self)
    }

    pub fn insert(&mut self, table: &str, values: &Row) -> Result<Row, DbError> {
        self.table_mut(table)?.insert(values)
    }

    pub fn update(&mut self, table: &str, request: &UpdateRequest) -> Result<usize, DbError> {
        self.table_mut(table)?.update(request)
    }

    pub fn delete(&mut self, table: &str, request: &DeleteRequest) -> Result<usize, DbError> {
        self.table_mut(table)?.delete(request)
    }

    pub fn subscribe<F>(
        &mut self,
        table: &str,
        kind: EventKind,
        listener: F,
    ) -> Result<ListenerId, DbError>
    where
        F: Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self.table_mut(table)?.subscribe(kind, listener))
    }

    /// Runs every table's deferred-flush check. Returns how many tables flushed.
    ///
    /// Tables that fail to flush stay dirty; the first error is returned after
    /// all tables were visited.
    pub fn tick(&mut self) -> Result<usize, DbError> {
        let mut flushed = 0;
        let mut first_error = None;
        for table in self.tables.values_mut() {
            match table.tick() {
                Ok(true) => flushed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Failed to flush table {}: {}", table.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Flushes every dirty table, continuing past failures.
    pub fn flush_all(&mut self) -> Result<(), DbError> {
        let table_count = self.tables.len();
        let mut flushed_count = 0;
        let mut first_error = None;

        for table in self.tables.values_mut().filter(|t| t.is_dirty()) {
            match table.flush() {
                Ok(()) => flushed_count += 1,
                Err(e) => {
                    tracing::error!("Failed to flush table {}: {}", table.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::debug!(
            "Flush completed: {} of {} tables written",
            flushed_count,
            table_count
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flushes every dirty table and releases the handle.
    pub fn close(mut self) -> Result<(), DbError> {
        let mut first_error = None;
        for table in self.tables.values_mut() {
            if let Err(e) = table.close() {
                tracing::error!("Failed to flush table {} on close: {}", table.name(), e);
                first_error.get_or_insert(e);
            }
        }
        tracing::info!("Closed database at {}", self.config.data_dir.display());
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl TableLookup for Database {
    fn lookup(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}
