//! Table engine: schema, validation, indexes, queries, mutations and events.

mod events;
mod field;
mod index;
mod query;
mod relation;
#[allow(clippy::module_inception)]
mod table;
pub mod validation;

pub use events::{Event, EventKind, Listener, ListenerId};
pub use field::{Cardinality, FieldSchema, Reference, TableSchema};
pub use query::{DeleteRequest, OrderBy, Query, SortDirection, UpdateRequest};
pub use relation::{resolve_relationships, Relationship};
pub use table::Table;

/// A stored row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;
