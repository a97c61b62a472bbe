//! Column definitions and the ordered table schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::FieldType;

/// Whether a relationship attaches one related row or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cardinality {
    One,
    Many,
}

/// Foreign-key descriptor declared on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Referenced table name
    pub table: String,
    /// Column in the referenced table
    pub field: String,
    /// ONE or MANY rows of this table per referenced row
    pub cardinality: Cardinality,
}

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Column name
    pub name: String,
    /// Declared kind
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Rejects `null` and absent values when set
    #[serde(default)]
    pub not_null: bool,
    /// Value used when an insert omits the column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Foreign key into another table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}

impl FieldSchema {
    /// Creates a nullable column with no default, enum or reference.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            not_null: false,
            default: None,
            enum_values: None,
            reference: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Declares this column as a key into `table.field`.
    pub fn references(
        mut self,
        table: impl Into<String>,
        field: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.reference = Some(Reference {
            table: table.into(),
            field: field.into(),
            cardinality,
        });
        self
    }

    /// Returns true if `value` is in the declared enum, or no enum is declared.
    pub fn allows(&self, value: &Value) -> bool {
        self.enum_values
            .as_ref()
            .map_or(true, |values| values.contains(value))
    }
}

/// Ordered mapping from column name to column definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Column definitions in declaration order
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    /// Looks up a column by name.
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
