//! Whole-file JSON storage for a single table.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::io_utils::{classify_io_error, retry_io_operation, RetryPolicy};
use crate::error::DbError;
use crate::table::{Row, TableSchema};

/// The JSON array file backing one table.
#[derive(Debug, Clone)]
pub struct TableFile {
    path: PathBuf,
    retry: RetryPolicy,
}

impl TableFile {
    /// File for `table` under `table_dir`.
    pub fn new(table_dir: &Path, table: &str, retry: RetryPolicy) -> Self {
        Self {
            path: table_dir.join(format!("{}.json", table)),
            retry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with `rows`, or leaves the previous file untouched on failure.
    pub fn write<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Result<(), DbError> {
        let rows: Vec<&Row> = rows.into_iter().collect();
        let json = serde_json::to_string_pretty(&rows)
            .map_err(|e| DbError::SerializationError(e.to_string()))?;
        retry_io_operation(|| self.write_internal(json.as_bytes()), self.retry, "flush_table")
    }

    fn write_internal(&self, bytes: &[u8]) -> Result<(), DbError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| classify_io_error(e, "Failed to create table directory"))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| classify_io_error(e, "Failed to create temp file"))?;
        file.write_all(bytes)
            .map_err(|e| classify_io_error(e, "Failed to write table"))?;
        file.sync_all()
            .map_err(|e| classify_io_error(e, "Failed to sync table"))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| classify_io_error(e, "Failed to rename table file"))?;
        Ok(())
    }

    /// Reads the stored rows. A missing file is an empty table.
    ///
    /// Every row must be an object whose keys all belong to `schema`.
    pub fn load(&self, table: &str, schema: &TableSchema) -> Result<Vec<Row>, DbError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| classify_io_error(e, "Failed to read table file"))?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| {
            DbError::SerializationError(format!("Failed to parse table '{}': {}", table, e))
        })?;

        let Value::Array(items) = value else {
            return Err(DbError::DataCorruption(format!(
                "Table file for '{}' is not a JSON array",
                table
            )));
        };

        let mut rows = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            let Value::Object(row) = item else {
                return Err(DbError::DataCorruption(format!(
                    "Row {} of table '{}' is not an object",
                    position, table
                )));
            };
            if let Some(key) = row.keys().find(|key| !schema.contains(key)) {
                return Err(DbError::DataCorruption(format!(
                    "Row {} of table '{}' has unknown column '{}'",
                    position, table, key
                )));
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
