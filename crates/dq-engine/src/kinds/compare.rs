//! Sample-based comparison of a reference query against a test object

use crate::align::align_samples;
use crate::diff::{diff_samples, hash_rows};
use crate::error::{EngineError, EngineResult};
use crate::precondition::{
    Checkable, PRIMARY_KEYS_ARE_SPECIFIED, SAMPLE_SIZE_IS_CONFIGURED, SPECS_ARE_UNIQUE,
    TESTOBJECT_EXISTS, TESTOBJECT_NOT_EMPTY,
};
use crate::test_case::{Outcome, TestCase, TestKind};
use async_trait::async_trait;
use dq_core::specification::find_unique;
use dq_core::{Column, SpecType, TableSchema, TestType};
use dq_db::SampleSource;
use std::time::Instant;

/// Fact labels recorded by the compare test
pub mod facts {
    pub const SAMPLE_SIZE: &str = "sample size";
    pub const SEED: &str = "seed";
    pub const SAMPLED_KEYS: &str = "sampled keys";
    pub const ROWS_RETRIEVED: &str = "rows retrieved";
    pub const SCHEMA: &str = "schema";
    pub const DISCREPANCIES: &str = "discrepancies";
}

/// Schema fact when both samples agreed on every column type
pub const SCHEMAS_MATCHED: &str = "schemas matched";

/// Verifies the rows reachable through a random key sample agree
#[derive(Debug, Default, Clone, Copy)]
pub struct CompareKind;

#[async_trait]
impl TestKind for CompareKind {
    fn test_type(&self) -> TestType {
        TestType::Compare
    }

    fn preconditions(&self) -> &'static [&'static str] {
        &[
            SPECS_ARE_UNIQUE,
            TESTOBJECT_EXISTS,
            TESTOBJECT_NOT_EMPTY,
            PRIMARY_KEYS_ARE_SPECIFIED,
            SAMPLE_SIZE_IS_CONFIGURED,
        ]
    }

    fn required_specs(&self) -> &'static [SpecType] {
        &[SpecType::Schema, SpecType::Compare]
    }

    async fn execute(&self, case: &mut TestCase) -> EngineResult<Outcome> {
        let backend = case.shared_backend();
        let object = case.test_object().clone();
        let coordinates = object.coordinates().clone();

        let schema_spec = find_unique(case.specs(), SpecType::Schema)
            .and_then(|s| s.as_schema())
            .ok_or(EngineError::MissingSpecification(SpecType::Schema))?;
        let primary_keys = schema_spec.primary_keys.clone();
        let compare_spec = find_unique(case.specs(), SpecType::Compare)
            .ok_or(EngineError::MissingSpecification(SpecType::Compare))?;
        let compare_location = compare_spec.location.clone();
        let logical_query = compare_spec
            .as_compare()
            .map(|q| q.query.clone())
            .ok_or(EngineError::MissingSpecification(SpecType::Compare))?;

        let (sample_size, size_source) = case
            .config()
            .compare
            .resolve_sample_size(object.name())
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "no sample size configured for '{}'",
                    object.name()
                ))
            })?;

        // Schema resolution
        let start = Instant::now();
        let reference_query = backend.translate_query(&logical_query, &coordinates)?;
        let reference_schema = backend
            .schema_of_query(&reference_query, &coordinates)
            .await?;
        check_primary_keys(&reference_schema, &primary_keys, &compare_location)?;
        let object_schema = backend.schema_of(&object).await?;
        check_primary_keys(&object_schema, &primary_keys, "test object")?;
        case.record_timing("schema resolution", start.elapsed());

        let columns: Vec<String> = reference_schema
            .iter()
            .filter(|c| object_schema.contains(&c.name))
            .map(|c| c.name.clone())
            .collect();
        let key_cast = key_cast_schema(&reference_schema, &object_schema, &primary_keys);

        // Key sampling
        let start = Instant::now();
        let keys = backend
            .sample_primary_keys(
                &reference_query,
                &primary_keys,
                sample_size,
                case.seed(),
                &coordinates,
                None,
            )
            .await?;
        case.record_timing("key sampling", start.elapsed());
        case.add_fact(
            facts::SAMPLE_SIZE,
            format!("{} ({})", sample_size, size_source),
        );
        case.add_fact(facts::SEED, case.seed().to_string());
        case.add_fact(facts::SAMPLED_KEYS, keys.len().to_string());

        // Data retrieval
        let start = Instant::now();
        let reference = backend
            .sample_by_keys(
                SampleSource::Query(&reference_query),
                &keys,
                &coordinates,
                Some(columns.as_slice()),
                None,
            )
            .await?;
        let actual = backend
            .sample_by_keys(
                SampleSource::Object(&object),
                &keys,
                &coordinates,
                Some(columns.as_slice()),
                key_cast.as_ref(),
            )
            .await?;
        case.record_timing("row sampling", start.elapsed());
        case.add_fact(
            facts::ROWS_RETRIEVED,
            format!("reference {}, actual {}", reference.num_rows(), actual.num_rows()),
        );

        let aligned = align_samples(reference, actual);
        if aligned.schemas_matched() {
            case.add_fact(facts::SCHEMA, SCHEMAS_MATCHED);
        } else {
            let columns: Vec<String> = aligned
                .alignments
                .iter()
                .map(|a| {
                    format!(
                        "{} ({} vs {} as {})",
                        a.column, a.reference_type, a.actual_type, a.aligned_type
                    )
                })
                .collect();
            case.add_fact(
                facts::SCHEMA,
                format!("schema mismatch harmonized: {}", columns.join(", ")),
            );
        }

        let start = Instant::now();
        let reference_hashes = hash_rows(&aligned.reference);
        let actual_hashes = hash_rows(&aligned.actual);
        case.record_timing("hashing", start.elapsed());

        let start = Instant::now();
        let diff = diff_samples(
            &aligned.reference,
            &reference_hashes,
            &aligned.actual,
            &actual_hashes,
            &primary_keys,
        );
        case.record_timing("diffing", start.elapsed());
        case.add_fact(facts::DISCREPANCIES, diff.total_rows.to_string());

        if diff.is_empty() {
            return Ok(Outcome::ok("sample matches"));
        }

        let summary = if diff.truncated {
            format!(
                "{} rows differ in sample of {} keys (showing first {})",
                diff.total_rows,
                keys.len(),
                diff.rows.len()
            )
        } else {
            format!(
                "{} rows differ in sample of {} keys",
                diff.total_rows,
                keys.len()
            )
        };
        case.set_diff(diff);
        Ok(Outcome::nok(summary))
    }
}

fn check_primary_keys(
    schema: &TableSchema,
    primary_keys: &[String],
    location: &str,
) -> EngineResult<()> {
    let missing = schema.missing(primary_keys);
    if missing.is_empty() {
        return Ok(());
    }
    Err(EngineError::PrimaryKeysMissing {
        location: location.to_string(),
        missing: missing.into_iter().map(String::from).collect(),
    })
}

/// Key columns whose native types differ between the two sides, typed as
/// in the reference. Keys are matched on their rendered text, and types of
/// one family can still render differently (`DECIMAL(12,4)` vs
/// `DECIMAL(10,2)`).
fn key_cast_schema(
    reference: &TableSchema,
    object: &TableSchema,
    primary_keys: &[String],
) -> Option<TableSchema> {
    let columns: Vec<Column> = primary_keys
        .iter()
        .filter_map(|k| {
            let reference_type = reference.type_of(k)?;
            let object_type = object.type_of(k)?;
            (!reference_type.eq_ignore_ascii_case(object_type))
                .then(|| Column::new(k.clone(), reference_type))
        })
        .collect();

    if columns.is_empty() {
        None
    } else {
        Some(TableSchema::new(columns))
    }
}

#[cfg(test)]
#[path = "compare_test.rs"]
mod tests;
