//! Table engine state and the write path.
//!
//! Each table has:
//! - Ordered column schema
//! - Slot arena of rows; deleted slots are freed, never reused
//! - One equality index per column, kept in lockstep with the arena
//! - Incoming relationships for `Extend`
//! - Flush policy and the JSON file it writes to

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use super::events::{Event, EventKind, Listener, ListenerId, Listeners};
use super::field::TableSchema;
use super::index::IndexSet;
use super::query::{matches_all, page_bounds, DeleteRequest, UpdateRequest};
use super::relation::Relationship;
use super::validation::{validate_insert, validate_update};
use super::Row;
use crate::config::DbConfig;
use crate::error::DbError;
use crate::persistence::{FlushPolicy, RetryPolicy, TableFile};

/// Per-table storage engine.
#[derive(Debug)]
pub struct Table {
    /// Table name
    pub(super) name: String,
    /// Column definitions in declaration order
    pub(super) schema: TableSchema,
    /// Row arena; `None` marks a freed slot
    pub(super) slots: Vec<Option<Row>>,
    /// Number of occupied slots
    pub(super) live: usize,
    pub(super) indexes: IndexSet,
    /// Incoming relationships keyed by referencing table name
    pub(super) relationships: HashMap<String, Relationship>,
    pub(super) listeners: Listeners,
    policy: FlushPolicy,
    file: TableFile,
    /// Freed-slot fraction that triggers compaction
    compact_ratio: f64,
    closed: bool,
}

impl Table {
    /// Creates an empty table.
    ///
    /// # Arguments
    /// * `name` - Table name, also the stem of its JSON file
    /// * `schema` - Column definitions in declaration order
    /// * `relationships` - Incoming relationships keyed by referencing table
    /// * `config` - Storage root, flush thresholds and compaction ratio
    ///
    /// # Returns
    /// A clean table with one empty index per column.
    pub fn new(
        name: impl Into<String>,
        schema: TableSchema,
        relationships: HashMap<String, Relationship>,
        config: &DbConfig,
    ) -> Self {
        let name = name.into();
        let file = TableFile::new(&config.table_dir(), &name, RetryPolicy::from_config(config));
        Self {
            indexes: IndexSet::new(&schema),
            name,
            schema,
            slots: Vec::new(),
            live: 0,
            relationships,
            listeners: Listeners::default(),
            policy: FlushPolicy::new(config.change_threshold, config.time_threshold()),
            file,
            compact_ratio: config.compact_ratio,
            closed: false,
        }
    }

    /// Creates a table hydrated from its JSON file, if one exists.
    ///
    /// # Arguments
    /// * `name` - Table name
    /// * `schema` - Column definitions in declaration order
    /// * `relationships` - Incoming relationships keyed by referencing table
    /// * `config` - Storage root, flush thresholds and compaction ratio
    ///
    /// # Returns
    /// `Result<Table, DbError>` with every stored row indexed, or
    /// `DataCorruption` if the file does not match the schema.
    pub fn load(
        name: impl Into<String>,
        schema: TableSchema,
        relationships: HashMap<String, Relationship>,
        config: &DbConfig,
    ) -> Result<Self, DbError> {
        let mut table = Self::new(name, schema, relationships, config);
        let rows = table.file.load(&table.name, &table.schema)?;
        table.live = rows.len();
        table.slots = rows.into_iter().map(Some).collect();
        table.indexes = IndexSet::build(&table.schema, &table.slots);
        tracing::debug!("Loaded {} rows into table {}", table.live, table.name);
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn relationships(&self) -> &HashMap<String, Relationship> {
        &self.relationships
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live rows in storage order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Row stored at `position`, if that slot is occupied.
    pub fn row_at(&self, position: usize) -> Option<&Row> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    /// Positions of rows currently holding `value` in `column`.
    pub fn get_by_index(&self, column: &str, value: &Value) -> Vec<usize> {
        self.indexes
            .lookup(column, value)
            .map(<[usize]>::to_vec)
            .unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.policy.is_dirty()
    }

    /// Index mutations since the last flush.
    pub fn pending_changes(&self) -> u64 {
        self.policy.change_count()
    }

    pub fn flush_policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// Registers a listener for one event kind.
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let listener: Box<Listener> = Box::new(listener);
        self.listeners.add(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub(super) fn check_columns<'a>(
        &self,
        columns: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), DbError> {
        for column in columns {
            if !self.schema.contains(column) {
                return Err(DbError::UnknownColumn {
                    table: self.name.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    /// Positions matching `matches`, sliced by `offset`/`limit`.
    fn select_positions(
        &self,
        matches: Option<&Row>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(p, slot)| slot.as_ref().map(|row| (p, row)))
            .filter(|(_, row)| matches_all(row, matches))
            .map(|(p, _)| p)
            .collect();
        let bounds = page_bounds(positions.len(), offset, limit);
        positions.drain(bounds).collect()
    }

    /// Validates and appends a row.
    ///
    /// # Arguments
    /// * `values` - Column values; omitted columns take their default or `null`
    ///
    /// # Returns
    /// `Result<Row, DbError>` containing the canonical stored row. A rejected
    /// row leaves the table unchanged.
    pub fn insert(&mut self, values: &Row) -> Result<Row, DbError> {
        let row = validate_insert(&self.name, values, &self.schema)?;

        let position = self.slots.len();
        let changes = self.indexes.insert_row(&row, position);
        self.slots.push(Some(row.clone()));
        self.live += 1;
        self.policy.mark_changed(changes as u64);

        self.listeners.emit(
            &self.name,
            Event::Insert {
                row: &row,
                position,
            },
        );
        self.after_mutation()?;
        Ok(row)
    }

    /// Applies `request.values` to the selected rows.
    ///
    /// # Arguments
    /// * `request` - Predicate, patch and the offset/limit applied to the selection
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the number of rows updated, or
    /// `UnknownColumn` / `Validation` before any row is touched.
    pub fn update(&mut self, request: &UpdateRequest) -> Result<usize, DbError> {
        if let Some(matches) = &request.matches {
            self.check_columns(matches.keys())?;
        }
        self.check_columns(request.values.keys())?;
        let patch = validate_update(&self.name, &request.values, &self.schema)?;

        let positions =
            self.select_positions(request.matches.as_ref(), request.offset, request.limit);

        let mut updated = 0;
        for position in positions {
            let Some(row) = self.slots[position].as_mut() else {
                continue;
            };
            let before = row.clone();

            let mut changes = 0u64;
            for (column, value) in &patch {
                if self
                    .indexes
                    .update_value(column, before.get(column), Some(value), position)
                {
                    changes += 1;
                }
                row.insert(column.clone(), value.clone());
            }
            self.policy.mark_changed(changes);

            if let Some(after) = self.slots[position].as_ref() {
                self.listeners.emit(
                    &self.name,
                    Event::Update {
                        before: &before,
                        after,
                        position,
                        patch: &patch,
                    },
                );
            }
            updated += 1;
        }

        self.after_mutation()?;
        Ok(updated)
    }

    /// Removes the selected rows.
    ///
    /// # Arguments
    /// * `request` - Predicate and the offset/limit applied to the selection
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the number of rows deleted.
    pub fn delete(&mut self, request: &DeleteRequest) -> Result<usize, DbError> {
        if let Some(matches) = &request.matches {
            self.check_columns(matches.keys())?;
        }

        let positions =
            self.select_positions(request.matches.as_ref(), request.offset, request.limit);

        let mut deleted = 0;
        for position in positions {
            let Some(row) = self.slots[position].take() else {
                continue;
            };
            let changes = self.indexes.remove_row(&row, position);
            self.live -= 1;
            self.policy.mark_changed(changes as u64);

            self.listeners
                .emit(&self.name, Event::Delete { row: &row, position });
            deleted += 1;
        }

        self.compact_if_sparse();
        self.after_mutation()?;
        Ok(deleted)
    }

    /// Drops freed slots and rebuilds every index once they outnumber `compact_ratio`.
    fn compact_if_sparse(&mut self) {
        let freed = self.slots.len() - self.live;
        if freed == 0 || (freed as f64) <= self.compact_ratio * self.slots.len() as f64 {
            return;
        }
        self.slots.retain(Option::is_some);
        self.indexes = IndexSet::build(&self.schema, &self.slots);
        tracing::debug!(
            "Compacted table {}: dropped {} freed slots",
            self.name,
            freed
        );
    }

    fn after_mutation(&mut self) -> Result<(), DbError> {
        if self.policy.should_flush(Instant::now()) {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes every live row to the table file.
    ///
    /// # Returns
    /// `Result<(), DbError>`. On error the previous file is intact and the
    /// table stays dirty.
    pub fn flush(&mut self) -> Result<(), DbError> {
        let pending = self.policy.change_count();
        self.file.write(self.slots.iter().filter_map(Option::as_ref))?;
        self.policy.flushed(Instant::now());
        tracing::debug!(
            "Flushed table {} ({} rows, {} pending changes)",
            self.name,
            self.live,
            pending
        );
        Ok(())
    }

    /// Flushes if the deferred-flush deadline has passed. Returns true if a flush happened.
    pub fn tick(&mut self) -> Result<bool, DbError> {
        if self.policy.is_due(Instant::now()) {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Flushes pending changes. After `close`, dropping the table does not flush again.
    pub fn close(&mut self) -> Result<(), DbError> {
        if self.policy.is_dirty() {
            self.flush()?;
        }
        self.closed = true;
        Ok(())
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if self.closed || !self.policy.is_dirty() {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!("Best-effort flush of table {} failed: {}", self.name, e);
        }
    }
}
