//! DuckDB data platform implementation

use crate::error::{DbError, DbResult};
use crate::table::{Cell, SampleKeys, Table};
use crate::traits::{Backend, SampleSource};
use crate::translate::{physical_schema, qualified_name, quote_ident, translate};
use async_trait::async_trait;
use dq_core::{Column, Coordinates, TableSchema, TestObject};
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// DuckDB data platform backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Execute multiple SQL statements
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Create the physical schema for the given coordinates if missing
    pub fn create_schema_for(&self, coordinates: &Coordinates) -> DbResult<()> {
        self.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_ident(&physical_schema(coordinates))
        ))
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn schema_of_sync(&self, object: &TestObject) -> DbResult<TableSchema> {
        let conn = self.lock()?;
        let schema = physical_schema(object.coordinates());
        let mut stmt = conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map(duckdb::params![schema, object.name().as_str()], |row| {
                Ok(Column::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(DbError::TableNotFound(qualified_name(object)));
        }
        Ok(TableSchema::new(columns))
    }

    fn sample_primary_keys_sync(
        &self,
        query: &str,
        primary_keys: &[String],
        sample_size: usize,
        seed: u64,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<SampleKeys> {
        if primary_keys.is_empty() {
            return Err(DbError::InvalidArgument {
                operation: "sample_primary_keys".to_string(),
                message: "no primary keys given".to_string(),
            });
        }
        if sample_size == 0 {
            return Err(DbError::InvalidArgument {
                operation: "sample_primary_keys".to_string(),
                message: "sample size must be greater than 0".to_string(),
            });
        }

        let distinct_keys = primary_keys
            .iter()
            .map(|k| format!("{} AS {}", varchar_expr(k, cast_schema), quote_ident(k)))
            .collect::<Vec<_>>()
            .join(", ");
        let key_columns = primary_keys
            .iter()
            .map(|k| quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");

        // Ordering by a seeded hash gives a pseudo-random but repeatable
        // pick; the key columns break hash ties.
        let sql = format!(
            "SELECT {key_columns} FROM (SELECT DISTINCT {distinct_keys} FROM ({query}) AS src) AS sample_keys \
             ORDER BY hash(concat_ws('|', {key_columns}, '{seed}')), {key_columns} \
             LIMIT {sample_size}",
            query = strip_terminator(query),
        );
        log::debug!("Sampling primary keys: {}", sql);

        let conn = self.lock()?;
        let values = collect_rows(&conn, &sql, primary_keys.len())?;
        Ok(SampleKeys::new(primary_keys.to_vec(), values))
    }

    fn sample_by_keys_sync(
        &self,
        source: SampleSource<'_>,
        keys: &SampleKeys,
        columns: Option<&[String]>,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<Table> {
        if keys.primary_keys.is_empty() {
            return Err(DbError::InvalidArgument {
                operation: "sample_by_keys".to_string(),
                message: "key sample has no key columns".to_string(),
            });
        }
        if keys
            .values
            .iter()
            .any(|v| v.len() != keys.primary_keys.len())
        {
            return Err(DbError::InvalidArgument {
                operation: "sample_by_keys".to_string(),
                message: "key values do not match the key columns".to_string(),
            });
        }

        let source_sql = match source {
            SampleSource::Query(query) => format!("({}) AS src", strip_terminator(query)),
            SampleSource::Object(object) => format!("{} AS src", qualified_name(object)),
        };

        let conn = self.lock()?;
        let available = describe(&conn, &format!("SELECT * FROM {source_sql}"))?;

        let selected: Vec<Column> = match columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    available
                        .type_of(name)
                        .map(|t| Column::new(name.clone(), t))
                        .ok_or_else(|| {
                            DbError::ExecutionError(format!(
                                "column '{name}' not found in sample source"
                            ))
                        })
                })
                .collect::<DbResult<_>>()?,
            None => available.columns().to_vec(),
        };
        if selected.is_empty() {
            return Err(DbError::InvalidArgument {
                operation: "sample_by_keys".to_string(),
                message: "no columns selected".to_string(),
            });
        }

        let schema: TableSchema = selected
            .into_iter()
            .map(|c| match cast_schema.and_then(|s| s.type_of(&c.name)) {
                Some(cast) => Column::new(c.name, cast),
                None => c,
            })
            .collect();

        let select_list = schema
            .iter()
            .map(|c| {
                format!(
                    "{} AS {}",
                    varchar_expr(&c.name, cast_schema),
                    quote_ident(&c.name)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let join_condition = keys
            .primary_keys
            .iter()
            .map(|k| {
                format!(
                    "{} IS NOT DISTINCT FROM sample_keys.{}",
                    varchar_expr(k, cast_schema),
                    quote_ident(k)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let scratch = ScratchTable::create(&conn, keys)?;
        let sql = format!(
            "SELECT {select_list} FROM {source_sql} JOIN {} AS sample_keys ON {join_condition}",
            quote_ident(&scratch.name)
        );
        log::debug!("Fetching rows by key sample: {}", sql);

        let rows = collect_rows(&conn, &sql, schema.len())?;
        drop(scratch);

        Ok(Table::new(schema, rows))
    }
}

#[async_trait]
impl Backend for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    async fn list_objects(&self, coordinates: &Coordinates) -> DbResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? ORDER BY table_name",
        )?;
        let names = stmt
            .query_map(duckdb::params![physical_schema(coordinates)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn row_count(&self, object: &TestObject, filter: Option<&str>) -> DbResult<usize> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", qualified_name(object));
        if let Some(filter) = filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }

        let conn = self.lock()?;
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn translate_query(&self, query: &str, coordinates: &Coordinates) -> DbResult<String> {
        translate(query, coordinates)
    }

    async fn run_query(&self, query: &str, _coordinates: &Coordinates) -> DbResult<Table> {
        let conn = self.lock()?;
        let query = strip_terminator(query);
        let schema = describe(&conn, query)?;
        let select_list = schema
            .iter()
            .map(|c| {
                format!(
                    "CAST(src.{col} AS VARCHAR) AS {col}",
                    col = quote_ident(&c.name)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let rows = collect_rows(
            &conn,
            &format!("SELECT {select_list} FROM ({query}) AS src"),
            schema.len(),
        )?;
        Ok(Table::new(schema, rows))
    }

    async fn schema_of(&self, object: &TestObject) -> DbResult<TableSchema> {
        self.schema_of_sync(object)
    }

    async fn schema_of_query(
        &self,
        query: &str,
        _coordinates: &Coordinates,
    ) -> DbResult<TableSchema> {
        let conn = self.lock()?;
        describe(&conn, strip_terminator(query))
    }

    async fn sample_primary_keys(
        &self,
        query: &str,
        primary_keys: &[String],
        sample_size: usize,
        seed: u64,
        _coordinates: &Coordinates,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<SampleKeys> {
        self.sample_primary_keys_sync(query, primary_keys, sample_size, seed, cast_schema)
    }

    async fn sample_by_keys(
        &self,
        source: SampleSource<'_>,
        keys: &SampleKeys,
        _coordinates: &Coordinates,
        columns: Option<&[String]>,
        cast_schema: Option<&TableSchema>,
    ) -> DbResult<Table> {
        self.sample_by_keys_sync(source, keys, columns, cast_schema)
    }
}

/// Temporary table holding one invocation's key sample.
///
/// The name is unique per invocation and the table is dropped when the
/// guard goes out of scope, on success and error paths alike.
struct ScratchTable<'c> {
    conn: &'c Connection,
    name: String,
}

impl<'c> ScratchTable<'c> {
    fn create(conn: &'c Connection, keys: &SampleKeys) -> DbResult<Self> {
        let name = format!("dq_sample_keys_{}", Uuid::new_v4().simple());
        let column_defs = keys
            .primary_keys
            .iter()
            .map(|k| format!("{} VARCHAR", quote_ident(k)))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE TEMP TABLE {} ({})",
            quote_ident(&name),
            column_defs
        ))?;
        let scratch = Self { conn, name };

        if !keys.is_empty() {
            let placeholders = vec!["?"; keys.primary_keys.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(&scratch.name),
                placeholders
            ))?;
            for value in &keys.values {
                stmt.execute(duckdb::params_from_iter(value.iter()))?;
            }
        }

        Ok(scratch)
    }
}

impl Drop for ScratchTable<'_> {
    fn drop(&mut self) {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(&self.name));
        if let Err(e) = self.conn.execute_batch(&sql) {
            log::warn!("Failed to drop scratch table {}: {}", self.name, e);
        }
    }
}

/// `CAST(src."col" AS VARCHAR)`, with an intermediate cast when the column
/// appears in `cast_schema`
fn varchar_expr(column: &str, cast_schema: Option<&TableSchema>) -> String {
    let col = format!("src.{}", quote_ident(column));
    match cast_schema.and_then(|s| s.type_of(column)) {
        Some(cast) => format!("CAST(CAST({col} AS {cast}) AS VARCHAR)"),
        None => format!("CAST({col} AS VARCHAR)"),
    }
}

/// Drop trailing whitespace and statement terminators so a query can be
/// embedded as a subquery
fn strip_terminator(query: &str) -> &str {
    query.trim().trim_end_matches(';').trim_end()
}

/// Result column schema of a query via `DESCRIBE`
fn describe(conn: &Connection, query: &str) -> DbResult<TableSchema> {
    let mut stmt = conn.prepare(&format!("DESCRIBE {query}"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(Column::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TableSchema::new(columns))
}

/// Execute a query whose columns are all VARCHAR and collect every row
fn collect_rows(conn: &Connection, sql: &str, width: usize) -> DbResult<Vec<Vec<Cell>>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Option<String>>(i))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
