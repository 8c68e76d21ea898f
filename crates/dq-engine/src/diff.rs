//! Row hashing and hash-based set difference of two samples

use crate::record::DiffPayload;
use dq_db::{Cell, Table};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Maximum number of example rows kept in a discrepancy payload
pub const MAX_DIFF_ROWS: usize = 500;

/// Discrepancy column naming the sample a row came from
pub const ORIGIN_COLUMN: &str = "dq_origin";

/// Discrepancy column holding the composite primary key
pub const KEY_COLUMN: &str = "dq_key";

/// Origin tag of rows only found in the reference sample
pub const ORIGIN_REFERENCE: &str = "reference";

/// Origin tag of rows only found in the actual sample
pub const ORIGIN_ACTUAL: &str = "actual";

const NULL_KEY: &str = "NULL";

/// SHA-256 over a row's `(column, value)` pairs, independent of column order
pub fn row_hash(columns: &[&str], row: &[Cell]) -> String {
    let mut pairs: Vec<(&str, &Cell)> = columns.iter().copied().zip(row.iter()).collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (name, cell) in pairs {
        hasher.update(name.as_bytes());
        hasher.update([0x1f]);
        match cell {
            Some(value) => {
                hasher.update(b"v");
                hasher.update(value.as_bytes());
            }
            None => hasher.update(b"n"),
        }
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

/// Content hash of every row of a table
pub fn hash_rows(table: &Table) -> Vec<String> {
    let columns = table.schema.column_names();
    table.rows.iter().map(|row| row_hash(&columns, row)).collect()
}

/// Rows of `reference` whose hash is absent from `actual` and vice versa.
///
/// Rows are reported in the reference column order, prefixed with their
/// origin and, when primary keys are given, their composite key. The
/// result is sorted by key (or first column) and capped at
/// [`MAX_DIFF_ROWS`]; `total_rows` keeps the true count.
pub fn diff_samples(
    reference: &Table,
    reference_hashes: &[String],
    actual: &Table,
    actual_hashes: &[String],
    primary_keys: &[String],
) -> DiffPayload {
    let column_names: Vec<String> = reference
        .schema
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    // Actual rows are laid out in reference column order.
    let actual_layout: Vec<Option<usize>> = column_names
        .iter()
        .map(|name| actual.column_index(name))
        .collect();
    let key_layout: Vec<Option<usize>> = primary_keys
        .iter()
        .map(|k| reference.column_index(k))
        .collect();

    let in_actual: HashSet<&str> = actual_hashes.iter().map(String::as_str).collect();
    let in_reference: HashSet<&str> = reference_hashes.iter().map(String::as_str).collect();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (row, hash) in reference.rows.iter().zip(reference_hashes) {
        if !in_actual.contains(hash.as_str()) {
            rows.push(discrepancy_row(ORIGIN_REFERENCE, row.clone(), &key_layout));
        }
    }
    for (row, hash) in actual.rows.iter().zip(actual_hashes) {
        if !in_reference.contains(hash.as_str()) {
            let ordered = actual_layout
                .iter()
                .map(|idx| idx.and_then(|i| row[i].clone()))
                .collect();
            rows.push(discrepancy_row(ORIGIN_ACTUAL, ordered, &key_layout));
        }
    }

    // Position 1 holds the key, or the first data column when keyless.
    rows.sort_by(|a, b| match a.get(1).cmp(&b.get(1)) {
        Ordering::Equal => a[0].cmp(&b[0]),
        other => other,
    });

    let total_rows = rows.len();
    rows.truncate(MAX_DIFF_ROWS);

    let mut columns = vec![ORIGIN_COLUMN.to_string()];
    if !primary_keys.is_empty() {
        columns.push(KEY_COLUMN.to_string());
    }
    columns.extend(column_names);

    DiffPayload {
        columns,
        rows,
        total_rows,
        truncated: total_rows > MAX_DIFF_ROWS,
    }
}

fn discrepancy_row(origin: &str, data: Vec<Cell>, key_layout: &[Option<usize>]) -> Vec<Cell> {
    let mut row = Vec::with_capacity(data.len() + 2);
    row.push(Some(origin.to_string()));
    if !key_layout.is_empty() {
        row.push(Some(composite_key(&data, key_layout)));
    }
    row.extend(data);
    row
}

fn composite_key(data: &[Cell], key_layout: &[Option<usize>]) -> String {
    key_layout
        .iter()
        .map(|idx| {
            idx.and_then(|i| data[i].as_deref())
                .unwrap_or(NULL_KEY)
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
#[path = "diff_test.rs"]
mod tests;
