//! Incoming relationships derived from other tables' foreign keys.

use std::collections::{BTreeMap, HashMap};

use super::field::{Cardinality, TableSchema};

/// Rows of `source_table` whose `remote_column` equals this row's `local_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Table holding the foreign key
    pub source_table: String,
    /// Column in this table the key points at
    pub local_column: String,
    /// Column in `source_table` carrying the key
    pub remote_column: String,
    /// ONE attaches a row, MANY attaches a list
    pub cardinality: Cardinality,
}

/// Collects, for `table_name`, every other table with a field referencing it.
///
/// Keyed by the referencing table's name, which is also the `Extend` name.
/// When one table references this one through several fields, the last
/// field in declaration order wins.
pub fn resolve_relationships(
    table_name: &str,
    schemas: &BTreeMap<String, TableSchema>,
) -> HashMap<String, Relationship> {
    let mut relationships = HashMap::new();
    for (source_table, schema) in schemas {
        if source_table == table_name {
            continue;
        }
        for field in &schema.fields {
            let Some(reference) = &field.reference else {
                continue;
            };
            if reference.table != table_name {
                continue;
            }
            relationships.insert(
                source_table.clone(),
                Relationship {
                    source_table: source_table.clone(),
                    local_column: reference.field.clone(),
                    remote_column: field.name.clone(),
                    cardinality: reference.cardinality,
                },
            );
        }
    }
    relationships
}
