//! Schema document, table files, and the flush policy.

mod io_utils;
mod policy;
mod schema;
mod table_file;


pub use io_utils::{classify_io_error, retry_io_operation, RetryPolicy};
pub use policy::FlushPolicy;
pub use schema::{validate_schema, SchemaFile, SCHEMA_VERSION};
pub use table_file::TableFile;
