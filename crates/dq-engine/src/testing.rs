//! In-memory test doubles for the engine

use crate::notify::Notifier;
use async_trait::async_trait;
use dq_core::{Coordinates, TableSchema, TestObject};
use dq_db::{Backend, Cell, DbError, DbResult, SampleKeys, SampleSource, Table};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Backend serving fixed tables.
///
/// Objects are looked up by name regardless of coordinates; queries by
/// their exact text. `translate_query` is the identity. Any operation can be
/// made to fail with [`StaticBackend::fail_on`].
#[derive(Debug, Default)]
pub struct StaticBackend {
    objects: BTreeMap<String, Table>,
    queries: HashMap<String, Table>,
    failures: HashMap<&'static str, String>,
}

impl StaticBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `table` as the test object `name`
    pub fn with_object(mut self, name: &str, table: Table) -> Self {
        self.objects.insert(name.to_string(), table);
        self
    }

    /// Serve `table` as the result of `query`
    pub fn with_query(mut self, query: &str, table: Table) -> Self {
        self.queries.insert(query.to_string(), table);
        self
    }

    /// Make `operation` (a `Backend` method name) fail with `message`
    pub fn fail_on(mut self, operation: &'static str, message: &str) -> Self {
        self.failures.insert(operation, message.to_string());
        self
    }

    fn injected(&self, operation: &str) -> DbResult<()> {
        match self.failures.get(operation) {
            Some(message) => Err(DbError::ExecutionError(message.clone())),
            None => Ok(()),
        }
    }

    fn object(&self, object: &TestObject) -> DbResult<&Table> {
        self.objects
            .get(object.name().as_str())
            .ok_or_else(|| DbError::TableNotFound(object.to_string()))
    }

    fn query(&self, query: &str) -> DbResult<&Table> {
        self.queries
            .get(query)
            .ok_or_else(|| DbError::ExecutionError(format!("unknown query: {}", query)))
    }
}

fn key_indices(table: &Table, primary_keys: &[String]) -> DbResult<Vec<usize>> {
    primary_keys
        .iter()
        .map(|k| {
            table
                .column_index(k)
                .ok_or_else(|| DbError::ExecutionError(format!("column '{}' not found", k)))
        })
        .collect()
}

fn key_of(row: &[Cell], indices: &[usize]) -> Vec<Cell> {
    indices.iter().map(|i| row[*i].clone()).collect()
}

#[async_trait]
impl Backend for StaticBackend {
    fn db_type(&self) -> &'static str {
        "static"
    }

    async fn list_objects(&self, _coordinates: &Coordinates) -> DbResult<Vec<String>> {
        self.injected("list_objects")?;
        Ok(self.objects.keys().cloned().collect())
    }

    async fn row_count(&self, object: &TestObject, _filter: Option<&str>) -> DbResult<usize> {
        self.injected("row_count")?;
        Ok(self.object(object)?.num_rows())
    }

    fn translate_query(&self, query: &str, _coordinates: &Coordinates) -> DbResult<String> {
        self.injected("translate_query")?;
        Ok(query.to_string())
    }

    async fn run_query(&self, query: &str, _coordinates: &Coordinates) -> DbResult<Table> {
        self.injected("run_query")?;
        self.query(query).cloned()
    }

    async fn schema_of(&self, object: &TestObject) -> DbResult<TableSchema> {
        self.injected("schema_of")?;
        Ok(self.object(object)?.schema.clone())
    }

    async fn schema_of_query(
        &self,
        query: &str,
        _coordinates: &Coordinates,
    ) -> DbResult<TableSchema> {
        self.injected("schema_of_query")?;
        Ok(self.query(query)?.schema.clone())
    }

    async fn sample_primary_keys(
        &self,
        query: &str,
        primary_keys: &[String],
        sample_size: usize,
        seed: u64,
        _coordinates: &Coordinates,
        _cast_schema: Option<&TableSchema>,
    ) -> DbResult<SampleKeys> {
        self.injected("sample_primary_keys")?;
        if primary_keys.is_empty() || sample_size == 0 {
            return Err(DbError::InvalidArgument {
                operation: "sample_primary_keys".to_string(),
                message: "primary keys and sample size are required".to_string(),
            });
        }

        let table = self.query(query)?;
        let indices = key_indices(table, primary_keys)?;

        let mut seen = HashSet::new();
        let mut keys: Vec<Vec<Cell>> = table
            .rows
            .iter()
            .map(|row| key_of(row, &indices))
            .filter(|key| seen.insert(key.clone()))
            .collect();
        keys.sort_by_cached_key(|key| {
            let mut hasher = DefaultHasher::new();
            seed.hash(&mut hasher);
            key.hash(&mut hasher);
            (hasher.finish(), key.clone())
        });
        keys.truncate(sample_size);

        Ok(SampleKeys::new(primary_keys.to_vec(), keys))
    }

    async fn sample_by_keys(
        &self,
        source: SampleSource<'_>,
        keys: &SampleKeys,
        _coordinates: &Coordinates,
        columns: Option<&[String]>,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<Table> {
        self.injected("sample_by_keys")?;
        let table = match source {
            SampleSource::Query(query) => self.query(query)?,
            SampleSource::Object(object) => self.object(object)?,
        };

        let indices = key_indices(table, &keys.primary_keys)?;
        let wanted: HashSet<&Vec<Cell>> = keys.values.iter().collect();

        let selected: Vec<usize> = match columns {
            Some(columns) => columns
                .iter()
                .map(|c| {
                    table.column_index(c).ok_or_else(|| {
                        DbError::ExecutionError(format!(
                            "column '{}' not found in sample source",
                            c
                        ))
                    })
                })
                .collect::<DbResult<_>>()?,
            None => (0..table.schema.len()).collect(),
        };

        let schema = selected
            .iter()
            .map(|i| {
                let mut column = table.schema.columns()[*i].clone();
                if let Some(cast) = cast_schema.and_then(|s| s.type_of(&column.name)) {
                    column.data_type = cast.to_string();
                }
                column
            })
            .collect();

        let rows = table
            .rows
            .iter()
            .filter(|row| wanted.contains(&key_of(row, &indices)))
            .map(|row| selected.iter().map(|i| row[*i].clone()).collect())
            .collect();

        Ok(Table::new(schema, rows))
    }
}

/// Notifier that keeps every message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Messages received so far
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

/// Build a table from literal cells; `"NULL"` becomes a null cell
pub fn table(columns: &[(&str, &str)], rows: &[&[&str]]) -> Table {
    let schema = TableSchema::from_pairs(columns.iter().copied());
    let rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match *cell {
                    "NULL" => None,
                    value => Some(value.to_string()),
                })
                .collect()
        })
        .collect();
    Table::new(schema, rows)
}
