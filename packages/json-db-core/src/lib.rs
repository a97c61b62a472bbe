//! Per-table storage engine for a schema-validated JSON record store.
//!
//! Provides field type checking, row validation, per-column equality
//! indexes, the query/join pipeline, and the dirty-tracking flush policy
//! that writes each table to its own JSON file.

pub mod config;
pub mod database;
pub mod error;
pub mod persistence;
pub mod table;
pub mod types;

pub use config::DbConfig;
pub use database::{Database, TableLookup};
pub use error::{DbError, Violation};
pub use table::{
    Cardinality, Event, EventKind, FieldSchema, ListenerId, OrderBy, Query, Reference,
    Relationship, Row, SortDirection, Table, TableSchema, UpdateRequest, DeleteRequest,
};
pub use types::FieldType;
