//! Query requests and the `get` pipeline.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::Event;
use super::field::Cardinality;
use super::index::index_key;
use super::{Row, Table};
use crate::database::TableLookup;
use crate::error::DbError;

/// Sort direction for `OrderBy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort key for `Query::order_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// A `get` request.
///
/// Filtering runs on raw rows, then projection, de-duplication, ordering,
/// relationship expansion and finally pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Query {
    /// Columns to keep; all columns when `None`
    pub columns: Option<Vec<String>>,
    /// Row count from `offset`; non-positive means unbounded
    pub limit: Option<i64>,
    /// Rows to skip; negative is treated as 0
    pub offset: Option<i64>,
    /// Drop rows identical to an earlier one after projection
    pub unique: bool,
    pub order_by: Option<OrderBy>,
    /// Conjunctive equality predicates
    pub matches: Option<Row>,
    /// Related tables to attach under `$<table>`
    pub extend: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality predicate.
    pub fn filter(mut self, column: impl Into<String>, value: Value) -> Self {
        self.matches
            .get_or_insert_with(Row::new)
            .insert(column.into(), value);
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn extend(mut self, table: impl Into<String>) -> Self {
        self.extend.push(table.into());
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An `update` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateRequest {
    pub matches: Option<Row>,
    /// Patch applied to every selected row
    pub values: Row,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl UpdateRequest {
    pub fn new(values: Row) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    pub fn filter(mut self, column: impl Into<String>, value: Value) -> Self {
        self.matches
            .get_or_insert_with(Row::new)
            .insert(column.into(), value);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A `delete` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeleteRequest {
    pub matches: Option<Row>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl DeleteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, value: Value) -> Self {
        self.matches
            .get_or_insert_with(Row::new)
            .insert(column.into(), value);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Slice bounds for `offset`/`limit` over `len` rows.
pub(crate) fn page_bounds(len: usize, offset: Option<i64>, limit: Option<i64>) -> Range<usize> {
    let start = usize::try_from(offset.unwrap_or(0).max(0))
        .unwrap_or(usize::MAX)
        .min(len);
    let end = match limit {
        Some(limit) if limit > 0 => start
            .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
            .min(len),
        _ => len,
    };
    start..end
}

/// Conjunctive equality on index keys. Absent columns compare as `null`.
pub(crate) fn matches_all(row: &Row, matches: Option<&Row>) -> bool {
    matches.map_or(true, |matches| {
        matches
            .iter()
            .all(|(column, expected)| index_key(row.get(column)) == index_key(Some(expected)))
    })
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over column values: null < bool < number < string < array < object.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

impl Table {
    /// Executes a `get` request.
    ///
    /// # Arguments
    /// * `query` - Filter, projection, ordering, joins and pagination
    /// * `lookup` - Supplies the sibling tables named in `query.extend`
    ///
    /// # Returns
    /// `Result<Vec<Row>, DbError>` containing the page of matching rows, with
    /// `$<table>` payloads for each extended relationship.
    pub fn get(&self, query: &Query, lookup: &dyn TableLookup) -> Result<Vec<Row>, DbError> {
        let matches = query.matches.as_ref();
        if let Some(matches) = matches {
            self.check_columns(matches.keys())?;
        }

        let candidates = self.select_rows(matches);

        let mut rows: Vec<Row> = match &query.columns {
            Some(columns) => candidates
                .into_iter()
                .map(|row| {
                    columns
                        .iter()
                        .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                        .collect::<Row>()
                })
                .collect(),
            None => candidates.into_iter().cloned().collect(),
        };

        if query.unique {
            let mut seen = HashSet::new();
            let mut unique = Vec::with_capacity(rows.len());
            for row in rows {
                let serialized = serde_json::to_string(&row)
                    .map_err(|e| DbError::SerializationError(e.to_string()))?;
                if seen.insert(serialized) {
                    unique.push(row);
                }
            }
            rows = unique;
        }

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        for relation in &query.extend {
            self.attach_relation(relation, &mut rows, lookup)?;
        }

        let bounds = page_bounds(rows.len(), query.offset, query.limit);
        let rows: Vec<Row> = rows.drain(bounds).collect();

        self.listeners.emit(&self.name, Event::Get { query, rows: &rows });
        Ok(rows)
    }

    /// Filtered rows in storage order. A single predicate on an indexed column uses the index.
    fn select_rows(&self, matches: Option<&Row>) -> Vec<&Row> {
        if let Some(matches) = matches {
            if matches.len() == 1 {
                if let Some((column, value)) = matches.iter().next() {
                    if self.indexes.is_indexed(column) {
                        return self
                            .indexes
                            .lookup(column, value)
                            .unwrap_or_default()
                            .iter()
                            .filter_map(|&p| self.slots.get(p).and_then(Option::as_ref))
                            .collect();
                    }
                }
            }
        }
        self.rows().filter(|row| matches_all(row, matches)).collect()
    }

    fn attach_relation(
        &self,
        relation: &str,
        rows: &mut [Row],
        lookup: &dyn TableLookup,
    ) -> Result<(), DbError> {
        let relationship =
            self.relationships
                .get(relation)
                .ok_or_else(|| DbError::RelationUndefined {
                    table: self.name.clone(),
                    relation: relation.to_string(),
                })?;
        let remote = lookup
            .lookup(&relationship.source_table)
            .ok_or_else(|| DbError::TableNotFound {
                table: relationship.source_table.clone(),
            })?;

        let mut related: HashMap<String, Value> = HashMap::new();
        for remote_row in remote.rows() {
            let key = match remote_row.get(&relationship.remote_column) {
                Some(value) if !value.is_null() => index_key(Some(value)),
                _ => continue,
            };
            match relationship.cardinality {
                Cardinality::One => {
                    related
                        .entry(key)
                        .or_insert_with(|| Value::Object(remote_row.clone()));
                }
                Cardinality::Many => {
                    let entry = related
                        .entry(key)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(list) = entry {
                        list.push(Value::Object(remote_row.clone()));
                    }
                }
            }
        }

        let attach_key = format!("${}", relation);
        for row in rows.iter_mut() {
            let payload = match row.get(&relationship.local_column) {
                Some(value) if !value.is_null() => related
                    .get(&index_key(Some(value)))
                    .cloned()
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
            row.insert(attach_key.clone(), payload);
        }
        Ok(())
    }
}
