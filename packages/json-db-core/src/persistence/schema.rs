//! Schema document read at database open.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::io_utils::classify_io_error;
use crate::error::DbError;
use crate::table::TableSchema;

/// Current schema document version.
pub const SCHEMA_VERSION: u32 = 1;

/// Schema file format for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    /// Schema version
    pub version: u32,
    /// Table definitions keyed by table name
    pub tables: BTreeMap<String, TableSchema>,
}

impl SchemaFile {
    pub fn new(tables: BTreeMap<String, TableSchema>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            tables,
        }
    }

    /// Reads and validates the schema document at `path`.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| classify_io_error(e, "Failed to read schema file"))?;
        let schema: SchemaFile = serde_json::from_str(&contents)
            .map_err(|e| DbError::SerializationError(format!("Failed to parse schema: {}", e)))?;
        validate_schema(&schema)?;
        Ok(schema)
    }

    /// Writes the schema document through a temp file and atomic rename.
    pub fn save(&self, path: &Path) -> Result<(), DbError> {
        let schema_json = serde_json::to_string_pretty(self)
            .map_err(|e| DbError::SerializationError(e.to_string()))?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| classify_io_error(e, "Failed to create data directory"))?;
        }
        let temp_path = path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| classify_io_error(e, "Failed to create temp file"))?;
        file.write_all(schema_json.as_bytes())
            .map_err(|e| classify_io_error(e, "Failed to write schema"))?;
        file.sync_all()
            .map_err(|e| classify_io_error(e, "Failed to sync schema"))?;
        fs::rename(&temp_path, path)
            .map_err(|e| classify_io_error(e, "Failed to rename schema file"))?;
        Ok(())
    }
}

/// Validates schema integrity: version, column names, defaults and references.
pub fn validate_schema(schema: &SchemaFile) -> Result<(), DbError> {
    if schema.version != SCHEMA_VERSION {
        return Err(DbError::DataCorruption(format!(
            "Unsupported schema version: {}",
            schema.version
        )));
    }

    for (table_name, table_schema) in &schema.tables {
        validate_table_schema(table_name, table_schema)?;
    }

    // References are checked once every table is known
    for (table_name, table_schema) in &schema.tables {
        for field in &table_schema.fields {
            let Some(reference) = &field.reference else {
                continue;
            };
            let target = schema.tables.get(&reference.table).ok_or_else(|| {
                DbError::DataCorruption(format!(
                    "Reference target table '{}' not found for '{}'.'{}'",
                    reference.table, table_name, field.name
                ))
            })?;
            if !target.contains(&reference.field) {
                return Err(DbError::DataCorruption(format!(
                    "Reference target field '{}' not found in table '{}'",
                    reference.field, reference.table
                )));
            }
        }
    }

    Ok(())
}

fn validate_table_schema(table_name: &str, table_schema: &TableSchema) -> Result<(), DbError> {
    if table_name.is_empty() {
        return Err(DbError::DataCorruption("Empty table name".to_string()));
    }

    let mut seen_names = HashSet::new();
    for field in &table_schema.fields {
        if field.name.is_empty() {
            return Err(DbError::DataCorruption(format!(
                "Empty field name in table '{}'",
                table_name
            )));
        }
        if !seen_names.insert(field.name.as_str()) {
            return Err(DbError::DataCorruption(format!(
                "Duplicate field name '{}' in table '{}'",
                field.name, table_name
            )));
        }
        if let Some(default) = &field.default {
            if !default.is_null() && !(field.field_type.check(default) && field.allows(default)) {
                return Err(DbError::DataCorruption(format!(
                    "Default for '{}'.'{}' is not a valid {}",
                    table_name, field.name, field.field_type
                )));
            }
        }
    }
    Ok(())
}
