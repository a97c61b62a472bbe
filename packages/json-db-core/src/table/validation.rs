//! Row validation for the insert and update write paths.

use serde_json::Value;

use super::field::{FieldSchema, TableSchema};
use super::Row;
use crate::error::{DbError, Violation};
use crate::types::FieldType;

/// Floats at or beyond this magnitude are kept as floats.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn rejected(table: &str, column: &str, violation: Violation) -> DbError {
    DbError::Validation {
        table: table.to_string(),
        column: column.to_string(),
        violation,
    }
}

fn reject_unknown_keys(table: &str, values: &Row, schema: &TableSchema) -> Result<(), DbError> {
    match values.keys().find(|key| !schema.contains(key)) {
        Some(key) => Err(rejected(table, key, Violation::UnknownKey)),
        None => Ok(()),
    }
}

/// Checks one present value against its column. `null` is only legal on nullable columns.
fn check_value(table: &str, field: &FieldSchema, value: &Value) -> Result<(), DbError> {
    if value.is_null() {
        if field.not_null {
            return Err(rejected(table, &field.name, Violation::MissingRequired));
        }
        return Ok(());
    }
    if !field.field_type.check(value) {
        return Err(rejected(
            table,
            &field.name,
            Violation::TypeMismatch {
                expected: field.field_type,
            },
        ));
    }
    if !field.allows(value) {
        return Err(rejected(table, &field.name, Violation::NotInEnum));
    }
    Ok(())
}

/// Stores integral floats in INT columns as integers so `4.0` and `4` match.
fn canonical_value(field: &FieldSchema, value: Value) -> Value {
    if field.field_type != FieldType::Int || !value.is_f64() {
        return value;
    }
    match value.as_f64() {
        Some(f) if f.abs() < I64_LIMIT => Value::from(f as i64),
        _ => value,
    }
}

/// Builds the canonical row for an insert.
///
/// Supplied values are taken as-is; omitted columns get their default, or
/// `null` when nullable, or stay absent. Every column is then checked.
pub fn validate_insert(table: &str, values: &Row, schema: &TableSchema) -> Result<Row, DbError> {
    reject_unknown_keys(table, values, schema)?;

    let mut row = Row::new();
    for field in &schema.fields {
        let value = match values.get(&field.name) {
            Some(value) => Some(value.clone()),
            None => match &field.default {
                Some(default) => Some(default.clone()),
                None if !field.not_null => Some(Value::Null),
                None => None,
            },
        };

        match value {
            Some(value) => {
                check_value(table, field, &value)?;
                row.insert(field.name.clone(), canonical_value(field, value));
            }
            None => return Err(rejected(table, &field.name, Violation::MissingRequired)),
        }
    }
    Ok(row)
}

/// Checks a partial patch for an update. Only supplied keys are inspected.
///
/// Returns the patch with INT values in canonical form.
pub fn validate_update(table: &str, values: &Row, schema: &TableSchema) -> Result<Row, DbError> {
    reject_unknown_keys(table, values, schema)?;
    let mut patch = Row::new();
    for (column, value) in values {
        if let Some(field) = schema.get(column) {
            check_value(table, field, value)?;
            patch.insert(column.clone(), canonical_value(field, value.clone()));
        }
    }
    Ok(patch)
}
