//! Tabular rowsets returned by a backend

use dq_core::TableSchema;

/// One cell: text rendering of the value, `None` for SQL NULL
pub type Cell = Option<String>;

/// A tabular result: native column types plus string-rendered rows.
///
/// Every row has exactly `schema.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names and native types, in result order
    pub schema: TableSchema,

    /// Rows of cells, aligned with `schema`
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table
    pub fn new(schema: TableSchema, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    /// Create an empty table with the given schema
    pub fn empty(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    /// Values of the named column, top to bottom
    pub fn column_values(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// First cell of the first row
    pub fn scalar(&self) -> Option<&Cell> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Sampled primary-key values, drawn once per compare execution and shared
/// between the reference and the actual retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleKeys {
    /// Key column names, in key order
    pub primary_keys: Vec<String>,

    /// Composite key values; each entry has one cell per key column
    pub values: Vec<Vec<Cell>>,
}

impl SampleKeys {
    /// Create a key sample
    pub fn new(primary_keys: Vec<String>, values: Vec<Vec<Cell>>) -> Self {
        Self {
            primary_keys,
            values,
        }
    }

    /// Number of sampled keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys were sampled
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_access() {
        let table = Table::new(
            TableSchema::from_pairs([("id", "INTEGER"), ("name", "VARCHAR")]),
            vec![
                vec![Some("1".to_string()), Some("a".to_string())],
                vec![Some("2".to_string()), None],
            ],
        );

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_index("name"), Some(1));
        assert_eq!(
            table.column_values("name").unwrap(),
            vec![&Some("a".to_string()), &None]
        );
        assert_eq!(table.scalar(), Some(&Some("1".to_string())));
        assert!(table.column_values("missing").is_none());
    }
}
