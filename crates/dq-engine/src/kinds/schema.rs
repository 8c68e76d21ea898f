//! Schema test: the object's columns match the schema specification

use crate::error::{EngineError, EngineResult};
use crate::harmonize::harmonize;
use crate::precondition::{Checkable, SPECS_ARE_UNIQUE, TESTOBJECT_EXISTS};
use crate::record::DiffPayload;
use crate::test_case::{Outcome, TestCase, TestKind};
use async_trait::async_trait;
use dq_core::specification::find_unique;
use dq_core::{SpecType, TableSchema, TestType};
use dq_db::Cell;
use std::time::Instant;

/// Diff origin of a column the object lacks
pub const MISSING: &str = "missing";
/// Diff origin of a column the specification does not declare
pub const UNEXPECTED: &str = "unexpected";
/// Diff origin of a column whose harmonized types disagree
pub const TYPE_MISMATCH: &str = "type mismatch";

/// Compares harmonized expected and actual column schemas
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaKind;

#[async_trait]
impl TestKind for SchemaKind {
    fn test_type(&self) -> TestType {
        TestType::Schema
    }

    fn preconditions(&self) -> &'static [&'static str] {
        &[SPECS_ARE_UNIQUE, TESTOBJECT_EXISTS]
    }

    fn required_specs(&self) -> &'static [SpecType] {
        &[SpecType::Schema]
    }

    async fn execute(&self, case: &mut TestCase) -> EngineResult<Outcome> {
        let backend = case.shared_backend();
        let object = case.test_object().clone();
        let expected = find_unique(case.specs(), SpecType::Schema)
            .and_then(|s| s.as_schema())
            .map(|s| harmonize(&s.columns))
            .ok_or(EngineError::MissingSpecification(SpecType::Schema))?;

        let start = Instant::now();
        let actual = harmonize(&backend.schema_of(&object).await?);
        case.record_timing("schema resolution", start.elapsed());
        case.add_fact("expected columns", expected.len().to_string());
        case.add_fact("actual columns", actual.len().to_string());

        let diff = schema_diff(&expected, &actual);
        if diff.is_empty() {
            return Ok(Outcome::ok("schema matches"));
        }

        let summary = format!("{} schema differences", diff.total_rows);
        case.set_diff(diff);
        Ok(Outcome::nok(summary))
    }
}

fn schema_diff(expected: &TableSchema, actual: &TableSchema) -> DiffPayload {
    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for column in expected {
        match actual.type_of(&column.name) {
            None => rows.push(diff_row(
                &column.name,
                Some(column.data_type.as_str()),
                None,
                MISSING,
            )),
            Some(actual_type) if actual_type != column.data_type => rows.push(diff_row(
                &column.name,
                Some(column.data_type.as_str()),
                Some(actual_type),
                TYPE_MISMATCH,
            )),
            Some(_) => {}
        }
    }
    for column in actual {
        if !expected.contains(&column.name) {
            rows.push(diff_row(
                &column.name,
                None,
                Some(column.data_type.as_str()),
                UNEXPECTED,
            ));
        }
    }

    DiffPayload {
        columns: ["column", "expected_type", "actual_type", "origin"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        total_rows: rows.len(),
        truncated: false,
        rows,
    }
}

fn diff_row(
    column: &str,
    expected: Option<&str>,
    actual: Option<&str>,
    origin: &str,
) -> Vec<Cell> {
    vec![
        Some(column.to_string()),
        expected.map(String::from),
        actual.map(String::from),
        Some(origin.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precondition::PreconditionRegistry;
    use crate::testing::{table, StaticBackend};
    use dq_core::{
        Coordinates, DomainConfig, SchemaSpecification, SpecKind, Specification, Status,
        TestObject, TestResult,
    };
    use std::sync::Arc;

    fn object() -> TestObject {
        TestObject::new(Coordinates::new("sales", "core", "dev"), "orders")
    }

    fn case(backend: StaticBackend, columns: &[(&str, &str)]) -> TestCase {
        let spec = Specification::new(
            "dq.yml#tests[0].schema",
            SpecKind::Schema(SchemaSpecification {
                test_object: object(),
                columns: TableSchema::from_pairs(columns.iter().copied()),
                primary_keys: vec![],
            }),
        );
        TestCase::new(
            "schema_orders",
            object(),
            vec![spec],
            Arc::new(DomainConfig::parse("domain: sales").unwrap()),
            Arc::new(backend),
            Arc::new(SchemaKind),
        )
    }

    fn backend() -> StaticBackend {
        StaticBackend::new().with_object(
            "orders",
            table(&[("id", "INTEGER"), ("amount", "DECIMAL(10,2)")], &[]),
        )
    }

    #[tokio::test]
    async fn test_schema_matches_after_harmonization() {
        let case = case(backend(), &[("id", "int"), ("amount", "NUMERIC(12,4)")]);
        let record = case.execute(&PreconditionRegistry::with_defaults()).await;

        assert_eq!(record.status, Status::Finished);
        assert_eq!(record.result, TestResult::Ok);
        assert!(record.diff.is_none());
    }

    #[tokio::test]
    async fn test_schema_differences() {
        let case = case(backend(), &[("id", "VARCHAR"), ("region", "VARCHAR")]);
        let record = case.execute(&PreconditionRegistry::with_defaults()).await;

        assert_eq!(record.result, TestResult::Nok);
        assert_eq!(record.summary, "3 schema differences");
        let diff = record.diff.unwrap();
        let origins: Vec<_> = diff.rows.iter().map(|r| r[3].clone().unwrap()).collect();
        assert_eq!(origins, vec![TYPE_MISMATCH, MISSING, UNEXPECTED]);
        assert_eq!(diff.rows[0][1], Some("string".to_string()));
        assert_eq!(diff.rows[0][2], Some("int".to_string()));
    }
}
