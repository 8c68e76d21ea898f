//! Row-count test: the object holds as many rows as a query says it should

use crate::error::{EngineError, EngineResult};
use crate::precondition::{Checkable, SPECS_ARE_UNIQUE, TESTOBJECT_EXISTS};
use crate::test_case::{Outcome, TestCase, TestKind};
use async_trait::async_trait;
use dq_core::specification::find_unique;
use dq_core::{SpecType, TestType};
use std::time::Instant;

/// Compares an expected count query against the object's row count
#[derive(Debug, Default, Clone, Copy)]
pub struct RowCountKind;

#[async_trait]
impl TestKind for RowCountKind {
    fn test_type(&self) -> TestType {
        TestType::RowCount
    }

    fn preconditions(&self) -> &'static [&'static str] {
        &[SPECS_ARE_UNIQUE, TESTOBJECT_EXISTS]
    }

    fn required_specs(&self) -> &'static [SpecType] {
        &[SpecType::RowCount]
    }

    async fn execute(&self, case: &mut TestCase) -> EngineResult<Outcome> {
        let backend = case.shared_backend();
        let object = case.test_object().clone();
        let coordinates = object.coordinates().clone();
        let logical_query = find_unique(case.specs(), SpecType::RowCount)
            .and_then(|s| s.as_rowcount())
            .map(|q| q.query.clone())
            .ok_or(EngineError::MissingSpecification(SpecType::RowCount))?;

        let start = Instant::now();
        let query = backend.translate_query(&logical_query, &coordinates)?;
        let table = backend.run_query(&query, &coordinates).await?;
        let expected = match table.scalar() {
            Some(Some(value)) => value.trim().parse::<usize>().map_err(|_| {
                EngineError::UnexpectedResult(format!(
                    "row count query returned '{}', expected an integer",
                    value
                ))
            })?,
            _ => {
                return Err(EngineError::UnexpectedResult(
                    "row count query returned no value".to_string(),
                ))
            }
        };
        let actual = backend.row_count(&object, None).await?;
        case.record_timing("row count", start.elapsed());

        case.add_fact("expected rows", expected.to_string());
        case.add_fact("actual rows", actual.to_string());

        if expected == actual {
            Ok(Outcome::ok(format!("{} rows as expected", actual)))
        } else {
            Ok(Outcome::nok(format!(
                "expected {} rows, found {}",
                expected, actual
            )))
        }
    }
}
