//! Data platform port consumed by the test engine

use crate::error::DbResult;
use crate::table::{SampleKeys, Table};
use async_trait::async_trait;
use dq_core::{Coordinates, TableSchema, TestObject};

/// Where `sample_by_keys` reads rows from
#[derive(Debug, Clone, Copy)]
pub enum SampleSource<'a> {
    /// A translated (physical) query
    Query(&'a str),
    /// A test object's table or view
    Object(&'a TestObject),
}

/// Data platform abstraction for dq
///
/// Implementations must be Send + Sync for async operation. Queries passed
/// to `run_query`, `schema_of_query`, and the sampling operations are
/// physical, i.e. already passed through [`Backend::translate_query`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Names of the objects that exist at the given coordinates
    async fn list_objects(&self, coordinates: &Coordinates) -> DbResult<Vec<String>>;

    /// Row count of a test object, optionally restricted by a SQL predicate
    async fn row_count(&self, object: &TestObject, filter: Option<&str>) -> DbResult<usize>;

    /// Translate a logical query into the backend's physical form
    fn translate_query(&self, query: &str, coordinates: &Coordinates) -> DbResult<String>;

    /// Execute a physical query and return its rows
    async fn run_query(&self, query: &str, coordinates: &Coordinates) -> DbResult<Table>;

    /// Column schema of a test object
    async fn schema_of(&self, object: &TestObject) -> DbResult<TableSchema>;

    /// Result column schema of a physical query
    async fn schema_of_query(&self, query: &str, coordinates: &Coordinates)
        -> DbResult<TableSchema>;

    /// Draw up to `sample_size` distinct primary-key values from the query
    /// result.
    ///
    /// The same `seed` against the same data yields the same keys in the
    /// same order. Key columns listed in `cast_schema` are cast to that type
    /// before sampling.
    async fn sample_primary_keys(
        &self,
        query: &str,
        primary_keys: &[String],
        sample_size: usize,
        seed: u64,
        coordinates: &Coordinates,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<SampleKeys>;

    /// Fetch the rows of `source` whose composite primary key is in `keys`.
    ///
    /// When `columns` is given, exactly those columns are returned in that
    /// order. Columns listed in `cast_schema` are cast to that type before
    /// key matching and selection.
    async fn sample_by_keys(
        &self,
        source: SampleSource<'_>,
        keys: &SampleKeys,
        coordinates: &Coordinates,
        columns: Option<&[String]>,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<Table>;
}
