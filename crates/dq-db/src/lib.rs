//! dq-db - Data platform layer for dq
//!
//! This crate provides the `Backend` port the test engine consumes, the
//! tabular rowset type it returns, logical query translation, and a DuckDB
//! implementation.

pub mod duckdb;
pub mod error;
pub mod table;
pub mod traits;
pub mod translate;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use table::{Cell, SampleKeys, Table};
pub use traits::{Backend, SampleSource};
pub use translate::{physical_schema, qualified_name, quote_ident};
