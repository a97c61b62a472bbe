//! Per-column equality indexes mapping a value to the slots holding it.

use std::collections::HashMap;

use serde_json::{Number, Value};

use super::field::TableSchema;
use super::Row;

/// Integral floats below this magnitude key the same as the matching integer.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Canonical bucket key for a column value. Absent and `null` share a key.
///
/// This is also the equality used by predicate scans, so `4`, `4.0`, `0.0`
/// and `-0.0` compare the way JSON numbers do.
pub(crate) fn index_key(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => number_key(n),
        Some(value) => value.to_string(),
        None => Value::Null.to_string(),
    }
}

fn number_key(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < EXACT_INT_LIMIT => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// One equality index per schema column.
#[derive(Debug, Default)]
pub(crate) struct IndexSet {
    columns: HashMap<String, HashMap<String, Vec<usize>>>,
}

impl IndexSet {
    /// Creates empty indexes for every column of `schema`.
    pub(crate) fn new(schema: &TableSchema) -> Self {
        let columns = schema
            .column_names()
            .map(|name| (name.to_string(), HashMap::new()))
            .collect();
        Self { columns }
    }

    /// Builds indexes by a full scan of the slot arena.
    pub(crate) fn build(schema: &TableSchema, slots: &[Option<Row>]) -> Self {
        let mut indexes = Self::new(schema);
        for (position, row) in slots.iter().enumerate() {
            if let Some(row) = row {
                indexes.insert_row(row, position);
            }
        }
        indexes
    }

    pub(crate) fn is_indexed(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Slots holding `value` in `column`, in storage order.
    pub(crate) fn lookup(&self, column: &str, value: &Value) -> Option<&[usize]> {
        let buckets = self.columns.get(column)?;
        Some(
            buckets
                .get(&index_key(Some(value)))
                .map_or(&[][..], Vec::as_slice),
        )
    }

    /// Adds `position` under the row's value in every column. Returns the number of buckets touched.
    pub(crate) fn insert_row(&mut self, row: &Row, position: usize) -> usize {
        for (column, buckets) in self.columns.iter_mut() {
            add_position(buckets, index_key(row.get(column)), position);
        }
        self.columns.len()
    }

    /// Removes `position` from the row's bucket in every column.
    pub(crate) fn remove_row(&mut self, row: &Row, position: usize) -> usize {
        for (column, buckets) in self.columns.iter_mut() {
            remove_position(buckets, &index_key(row.get(column)), position);
        }
        self.columns.len()
    }

    /// Moves `position` from the bucket of `old` to the bucket of `new`.
    ///
    /// Returns false without touching the index when the values are equal.
    pub(crate) fn update_value(
        &mut self,
        column: &str,
        old: Option<&Value>,
        new: Option<&Value>,
        position: usize,
    ) -> bool {
        let old_key = index_key(old);
        let new_key = index_key(new);
        if old_key == new_key {
            return false;
        }
        let Some(buckets) = self.columns.get_mut(column) else {
            return false;
        };
        remove_position(buckets, &old_key, position);
        add_position(buckets, new_key, position);
        true
    }
}

fn add_position(buckets: &mut HashMap<String, Vec<usize>>, key: String, position: usize) {
    let bucket = buckets.entry(key).or_default();
    if let Err(at) = bucket.binary_search(&position) {
        bucket.insert(at, position);
    }
}

fn remove_position(buckets: &mut HashMap<String, Vec<usize>>, key: &str, position: usize) {
    if let Some(bucket) = buckets.get_mut(key) {
        if let Some(at) = bucket.iter().position(|&p| p == position) {
            bucket.remove(at);
        }
        if bucket.is_empty() {
            buckets.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::FieldSchema;
    use crate::types::FieldType;
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            FieldSchema::new("id", FieldType::Int),
            FieldSchema::new("tag", FieldType::Text),
        ])
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn build_and_lookup() {
        let slots = vec![
            Some(row(json!({"id": 1, "tag": "a"}))),
            None,
            Some(row(json!({"id": 2, "tag": "a"}))),
        ];
        let indexes = IndexSet::build(&schema(), &slots);
        assert_eq!(indexes.lookup("tag", &json!("a")), Some(&[0, 2][..]));
        assert_eq!(indexes.lookup("tag", &json!("b")), Some(&[][..]));
        assert_eq!(indexes.lookup("missing", &json!("a")), None);
    }

    #[test]
    fn update_moves_between_buckets() {
        let mut indexes = IndexSet::new(&schema());
        indexes.insert_row(&row(json!({"id": 1, "tag": "a"})), 0);
        indexes.insert_row(&row(json!({"id": 2, "tag": "b"})), 1);

        assert!(indexes.update_value("tag", Some(&json!("b")), Some(&json!("a")), 1));
        assert!(!indexes.update_value("tag", Some(&json!("a")), Some(&json!("a")), 1));
        assert_eq!(indexes.lookup("tag", &json!("a")), Some(&[0, 1][..]));
        assert_eq!(indexes.lookup("tag", &json!("b")), Some(&[][..]));
    }

    #[test]
    fn absent_and_null_share_a_bucket() {
        let mut indexes = IndexSet::new(&schema());
        indexes.insert_row(&row(json!({"id": 1})), 0);
        indexes.insert_row(&row(json!({"id": 2, "tag": null})), 1);
        assert_eq!(indexes.lookup("tag", &Value::Null), Some(&[0, 1][..]));

        indexes.remove_row(&row(json!({"id": 1})), 0);
        assert_eq!(indexes.lookup("tag", &Value::Null), Some(&[1][..]));
        assert_eq!(indexes.lookup("id", &json!(1)), Some(&[][..]));
    }

    #[test]
    fn equal_numbers_share_a_key() {
        assert_eq!(index_key(Some(&json!(4))), index_key(Some(&json!(4.0))));
        assert_eq!(index_key(Some(&json!(0))), index_key(Some(&json!(-0.0))));
        assert_eq!(index_key(Some(&json!(0.0))), index_key(Some(&json!(-0.0))));
        assert_ne!(index_key(Some(&json!(4))), index_key(Some(&json!(4.5))));
        assert_ne!(index_key(Some(&json!(4))), index_key(Some(&json!("4"))));
    }
}
