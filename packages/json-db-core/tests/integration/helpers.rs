//! Shared fixtures for integration tests.

use std::collections::BTreeMap;

use json_db_core::persistence::SchemaFile;
use json_db_core::{Cardinality, DbConfig, FieldSchema, FieldType, Row, TableSchema};
use serde_json::Value;
use tempfile::TempDir;

/// `Users{ID: INT notNull, Email: EMAIL, Password: PASSWORD notNull}` and
/// `Profile{UserID: INT reference Users.ID (ONE), Data: JSON}`.
pub fn users_and_profile() -> SchemaFile {
    let mut tables = BTreeMap::new();
    tables.insert(
        "Users".to_string(),
        TableSchema::new(vec![
            FieldSchema::new("ID", FieldType::Int).not_null(),
            FieldSchema::new("Email", FieldType::Email),
            FieldSchema::new("Password", FieldType::Password).not_null(),
        ]),
    );
    tables.insert(
        "Profile".to_string(),
        TableSchema::new(vec![
            FieldSchema::new("UserID", FieldType::Int).references("Users", "ID", Cardinality::One),
            FieldSchema::new("Data", FieldType::Json),
        ]),
    );
    SchemaFile::new(tables)
}

/// Routes engine logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Config rooted in `dir` that never flushes on its own.
pub fn manual_config(dir: &TempDir) -> DbConfig {
    DbConfig {
        change_threshold: u64::MAX,
        time_threshold_ms: 3_600_000,
        ..DbConfig::with_data_dir(dir.path())
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
