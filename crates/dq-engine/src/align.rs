//! Type alignment of two retrieved samples
//!
//! Columns whose native types agree are left alone. For the others every
//! cell on both sides is coerced into the canonical form of the
//! reference's harmonized type; when any cell refuses, both sides of that
//! column stay in their raw text form, which is always comparable.

use crate::coerce::coerce;
use crate::harmonize::{harmonize_type, STRING};
use dq_core::Column;
use dq_db::{Cell, Table};

/// How one mismatched column was reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlignment {
    /// Column name
    pub column: String,
    /// Native type in the reference sample
    pub reference_type: String,
    /// Native type in the actual sample
    pub actual_type: String,
    /// Type both sides now share (`string` on fallback)
    pub aligned_type: String,
    /// Whether the raw text fallback was used
    pub fallback: bool,
}

/// Two samples with reconciled column types
#[derive(Debug, Clone)]
pub struct AlignedSamples {
    pub reference: Table,
    pub actual: Table,
    /// One entry per column whose native types differed
    pub alignments: Vec<ColumnAlignment>,
}

impl AlignedSamples {
    /// Whether both samples already agreed on every column type
    pub fn schemas_matched(&self) -> bool {
        self.alignments.is_empty()
    }
}

/// Reconcile the column types of `actual` with those of `reference`.
///
/// Columns are matched by name; columns missing from either side are not
/// touched.
pub fn align_samples(mut reference: Table, mut actual: Table) -> AlignedSamples {
    let mut alignments = Vec::new();

    for ref_idx in 0..reference.schema.len() {
        let name = reference.schema.columns()[ref_idx].name.clone();
        let Some(act_idx) = actual.column_index(&name) else {
            continue;
        };

        let reference_type = reference.schema.columns()[ref_idx].data_type.clone();
        let actual_type = actual.schema.columns()[act_idx].data_type.clone();
        if reference_type.eq_ignore_ascii_case(&actual_type) {
            continue;
        }

        let target = harmonize_type(&reference_type);
        let coerced_ref = coerce_column(&reference.rows, ref_idx, &target);
        let coerced_act = coerce_column(&actual.rows, act_idx, &target);

        let (aligned_type, fallback) = match (coerced_ref, coerced_act) {
            (Some(ref_cells), Some(act_cells)) => {
                replace_column(&mut reference.rows, ref_idx, ref_cells);
                replace_column(&mut actual.rows, act_idx, act_cells);
                (target, false)
            }
            _ => (STRING.to_string(), true),
        };

        log::debug!(
            "Aligned column '{}' ({} vs {}) as {}",
            name,
            reference_type,
            actual_type,
            aligned_type
        );

        set_type(&mut reference, ref_idx, &aligned_type);
        set_type(&mut actual, act_idx, &aligned_type);
        alignments.push(ColumnAlignment {
            column: name,
            reference_type,
            actual_type,
            aligned_type,
            fallback,
        });
    }

    AlignedSamples {
        reference,
        actual,
        alignments,
    }
}

/// Coerce every non-null cell of a column; `None` if any cell refuses
fn coerce_column(rows: &[Vec<Cell>], idx: usize, target: &str) -> Option<Vec<Cell>> {
    rows.iter()
        .map(|row| match &row[idx] {
            Some(value) => coerce(value, target).map(Some),
            None => Some(None),
        })
        .collect()
}

fn replace_column(rows: &mut [Vec<Cell>], idx: usize, cells: Vec<Cell>) {
    for (row, cell) in rows.iter_mut().zip(cells) {
        row[idx] = cell;
    }
}

fn set_type(table: &mut Table, idx: usize, data_type: &str) {
    let columns: Vec<Column> = table
        .schema
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == idx {
                Column::new(c.name.clone(), data_type)
            } else {
                c.clone()
            }
        })
        .collect();
    table.schema = columns.into_iter().collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::table;

    #[test]
    fn test_matching_types_untouched() {
        let reference = table(
            &[("id", "INTEGER"), ("amount", "DECIMAL(10,2)")],
            &[&["1", "10.50"]],
        );
        let actual = reference.clone();

        let aligned = align_samples(reference.clone(), actual);

        assert!(aligned.schemas_matched());
        assert_eq!(aligned.reference, reference);
        assert_eq!(aligned.actual, reference);
    }

    #[test]
    fn test_mismatch_coerced_to_reference_type() {
        let reference = table(
            &[("id", "INTEGER"), ("amount", "DECIMAL(10,2)")],
            &[&["1", "10.50"], &["2", "NULL"]],
        );
        let actual = table(
            &[("id", "INTEGER"), ("amount", "VARCHAR")],
            &[&["1", "10.5"], &["2", "NULL"]],
        );

        let aligned = align_samples(reference, actual);

        assert_eq!(aligned.alignments.len(), 1);
        let alignment = &aligned.alignments[0];
        assert_eq!(alignment.column, "amount");
        assert_eq!(alignment.aligned_type, "decimal");
        assert!(!alignment.fallback);
        assert_eq!(aligned.reference.rows, aligned.actual.rows);
        assert_eq!(aligned.actual.schema.type_of("amount"), Some("decimal"));
    }

    #[test]
    fn test_string_whitespace_preserved() {
        let reference = table(
            &[("id", "INTEGER"), ("name", "VARCHAR")],
            &[&["1", "  alice  "]],
        );
        let actual = table(&[("id", "INTEGER"), ("name", "TEXT")], &[&["1", "alice"]]);

        let aligned = align_samples(reference, actual);

        assert_eq!(aligned.alignments[0].aligned_type, STRING);
        assert_eq!(aligned.reference.rows[0][1].as_deref(), Some("  alice  "));
        assert_eq!(aligned.actual.rows[0][1].as_deref(), Some("alice"));
        assert_ne!(aligned.reference.rows, aligned.actual.rows);
    }

    #[test]
    fn test_uncastable_falls_back_to_text() {
        let reference = table(&[("id", "INTEGER"), ("code", "INTEGER")], &[&["1", "7"]]);
        let actual = table(&[("id", "INTEGER"), ("code", "VARCHAR")], &[&["1", "seven"]]);

        let aligned = align_samples(reference, actual);

        let alignment = &aligned.alignments[0];
        assert!(alignment.fallback);
        assert_eq!(alignment.aligned_type, STRING);
        assert_eq!(
            aligned.reference.rows,
            vec![vec![Some("1".to_string()), Some("7".to_string())]]
        );
        assert_eq!(
            aligned.actual.rows,
            vec![vec![Some("1".to_string()), Some("seven".to_string())]]
        );
        assert_eq!(aligned.reference.schema.type_of("code"), Some(STRING));
    }
}
