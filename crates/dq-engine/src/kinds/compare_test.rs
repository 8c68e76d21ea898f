use super::*;
use crate::diff::{MAX_DIFF_ROWS, ORIGIN_REFERENCE};
use crate::error::ErrorKind;
use crate::precondition::PreconditionRegistry;
use crate::testing::{table, StaticBackend};
use dq_core::{
    Coordinates, DomainConfig, QuerySpecification, SchemaSpecification, SpecKind, Specification,
    Status, TestObject, TestResult,
};
use dq_db::{Backend, SampleKeys, Table};
use std::sync::Arc;

const REFERENCE: &str = "SELECT id, name, amount FROM {{ ref('orders') }}";
const CONFIG: &str = "domain: sales\ncompare:\n  sample_size: 10\n";
const COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER"),
    ("name", "VARCHAR"),
    ("amount", "DECIMAL(10,2)"),
];

fn object() -> TestObject {
    TestObject::new(Coordinates::new("sales", "core", "dev"), "orders")
}

fn specs(primary_keys: &[&str]) -> Vec<Specification> {
    vec![
        Specification::new(
            "dq.yml#tests[0].schema",
            SpecKind::Schema(SchemaSpecification {
                test_object: object(),
                columns: TableSchema::from_pairs(COLUMNS.iter().copied()),
                primary_keys: primary_keys.iter().map(|k| k.to_string()).collect(),
            }),
        ),
        Specification::new(
            "dq.yml#tests[0].compare_sql",
            SpecKind::Compare(QuerySpecification {
                test_object: object(),
                query: REFERENCE.to_string(),
            }),
        ),
    ]
}

fn backend(reference: Table, actual: Table) -> StaticBackend {
    StaticBackend::new()
        .with_query(REFERENCE, reference)
        .with_object("orders", actual)
}

fn case_with(backend: StaticBackend, config: &str, primary_keys: &[&str]) -> TestCase {
    TestCase::new(
        "compare_orders",
        object(),
        specs(primary_keys),
        Arc::new(DomainConfig::parse(config).unwrap()),
        Arc::new(backend),
        Arc::new(CompareKind),
    )
}

async fn run(backend: StaticBackend) -> crate::record::TestCaseRecord {
    case_with(backend, CONFIG, &["id"])
        .with_seed(42)
        .execute(&PreconditionRegistry::with_defaults())
        .await
}

fn orders() -> Table {
    table(
        COLUMNS,
        &[&["1", "alice", "10.50"], &["2", "bob", "NULL"], &["3", "carol", "7.25"]],
    )
}

#[tokio::test]
async fn test_identical_samples_match() {
    let reversed = table(
        COLUMNS,
        &[&["3", "carol", "7.25"], &["2", "bob", "NULL"], &["1", "alice", "10.50"]],
    );

    let record = run(backend(orders(), reversed)).await;

    assert_eq!(record.status, Status::Finished);
    assert_eq!(record.result, TestResult::Ok);
    assert_eq!(record.summary, "sample matches");
    assert!(record.diff.is_none());
    assert_eq!(record.fact(facts::SCHEMA), Some(SCHEMAS_MATCHED));
    assert_eq!(record.fact(facts::SAMPLE_SIZE), Some("10 (domain default)"));
    assert_eq!(record.fact(facts::SEED), Some("42"));
    assert_eq!(record.fact(facts::SAMPLED_KEYS), Some("3"));
    assert_eq!(record.fact(facts::ROWS_RETRIEVED), Some("reference 3, actual 3"));

    let steps: Vec<_> = record.details.iter().map(|d| d.step.as_str()).collect();
    for step in ["schema resolution", "key sampling", "row sampling", "hashing", "diffing"] {
        assert!(steps.contains(&step), "{step}");
    }
}

#[tokio::test]
async fn test_missing_row_reported_from_reference() {
    let actual = table(COLUMNS, &[&["1", "alice", "10.50"], &["3", "carol", "7.25"]]);

    let record = run(backend(orders(), actual)).await;

    assert_eq!(record.status, Status::Finished);
    assert_eq!(record.result, TestResult::Nok);
    assert_eq!(record.summary, "1 rows differ in sample of 3 keys");
    let diff = record.diff.unwrap();
    assert_eq!(diff.total_rows, 1);
    assert_eq!(diff.rows.len(), 1);
    assert_eq!(diff.rows[0][0], Some(ORIGIN_REFERENCE.to_string()));
    assert_eq!(diff.rows[0][1], Some("2".to_string()));
}

#[tokio::test]
async fn test_large_discrepancy_capped() {
    let ids: Vec<String> = (0..600).map(|i| i.to_string()).collect();
    let reference_rows: Vec<Vec<&str>> = ids
        .iter()
        .map(|id| vec![id.as_str(), "x", "1.00"])
        .collect();
    let actual_rows: Vec<Vec<&str>> = ids
        .iter()
        .map(|id| vec![id.as_str(), "y", "1.00"])
        .collect();
    let reference_refs: Vec<&[&str]> = reference_rows.iter().map(|r| r.as_slice()).collect();
    let actual_refs: Vec<&[&str]> = actual_rows.iter().map(|r| r.as_slice()).collect();

    let config = "domain: sales\ncompare:\n  sample_sizes:\n    orders: 1000\n";
    let record = case_with(
        backend(table(COLUMNS, &reference_refs), table(COLUMNS, &actual_refs)),
        config,
        &["id"],
    )
    .execute(&PreconditionRegistry::with_defaults())
    .await;

    assert_eq!(record.result, TestResult::Nok);
    assert!(record.summary.starts_with("1200 rows differ"));
    assert_eq!(record.fact(facts::SAMPLE_SIZE), Some("1000 (test object config)"));
    let diff = record.diff.unwrap();
    assert_eq!(diff.total_rows, 1200);
    assert_eq!(diff.rows.len(), MAX_DIFF_ROWS);
    assert!(diff.truncated);
}

#[tokio::test]
async fn test_type_mismatch_harmonized() {
    let actual = table(
        &[("id", "BIGINT"), ("name", "VARCHAR"), ("amount", "VARCHAR")],
        &[&["1", "alice", "10.5"], &["2", "bob", "NULL"], &["3", "carol", "7.250"]],
    );

    let record = run(backend(orders(), actual)).await;

    assert_eq!(record.result, TestResult::Ok);
    let schema_fact = record.fact(facts::SCHEMA).unwrap();
    assert!(schema_fact.starts_with("schema mismatch harmonized"));
    assert!(schema_fact.contains("amount"));
    // The key column is cast to the reference type before retrieval.
    assert!(!schema_fact.contains("id ("));
}

#[tokio::test]
async fn test_primary_keys_missing_from_reference() {
    let reference = table(&[("order_id", "INTEGER"), ("name", "VARCHAR")], &[&["1", "alice"]]);

    let record = run(backend(reference, orders())).await;

    assert_eq!(record.status, Status::Error);
    assert_eq!(record.result, TestResult::Na);
    assert!(record
        .summary
        .starts_with(&ErrorKind::SpecificationDefect.to_string()));
    assert!(record.summary.contains("dq.yml#tests[0].compare_sql"));
    assert!(record.summary.contains(": id"));
}

#[tokio::test]
async fn test_primary_keys_missing_from_object() {
    let actual = table(&[("name", "VARCHAR")], &[&["alice"]]);

    let record = run(backend(orders(), actual)).await;

    assert_eq!(record.status, Status::Error);
    assert!(record.summary.contains("Primary keys missing from test object"));
}

#[tokio::test]
async fn test_backend_failure_during_sampling() {
    let failing = backend(orders(), orders()).fail_on("sample_by_keys", "scratch table gone");

    let record = run(failing).await;

    assert_eq!(record.status, Status::Error);
    assert_eq!(record.result, TestResult::Na);
    assert!(record.summary.starts_with(&ErrorKind::Backend.to_string()));
    assert!(record.summary.contains("scratch table gone"));
}

#[tokio::test]
async fn test_empty_object_aborts() {
    let record = run(backend(orders(), table(COLUMNS, &[]))).await;

    assert_eq!(record.status, Status::Aborted);
    assert_eq!(record.result, TestResult::Na);
    assert!(record.summary.contains("'testobject_not_empty'"));
}

#[tokio::test]
async fn test_undeclared_primary_keys_abort() {
    let record = case_with(backend(orders(), orders()), CONFIG, &[])
        .execute(&PreconditionRegistry::with_defaults())
        .await;

    assert_eq!(record.status, Status::Aborted);
    assert!(record.summary.contains("'primary_keys_are_specified'"));
}

#[tokio::test]
async fn test_row_retrieval_is_reproducible() {
    let backend = backend(orders(), orders());
    let keys = SampleKeys::new(
        vec!["id".to_string()],
        vec![vec![Some("1".to_string())], vec![Some("3".to_string())]],
    );
    let coordinates = object().coordinates().clone();

    let first = backend
        .sample_by_keys(SampleSource::Query(REFERENCE), &keys, &coordinates, None, None)
        .await
        .unwrap();
    let second = backend
        .sample_by_keys(SampleSource::Query(REFERENCE), &keys, &coordinates, None, None)
        .await
        .unwrap();

    assert_eq!(first.num_rows(), 2);
    assert_eq!(first, second);
}

#[test]
fn test_key_cast_for_differing_native_key_types() {
    let reference = TableSchema::from_pairs([("id", "DECIMAL(12,4)"), ("name", "VARCHAR")]);
    let same = TableSchema::from_pairs([("id", "decimal(12,4)"), ("name", "INTEGER")]);
    let rescaled = TableSchema::from_pairs([("id", "DECIMAL(10,2)"), ("name", "VARCHAR")]);
    let different = TableSchema::from_pairs([("id", "INTEGER"), ("name", "VARCHAR")]);
    let keys = vec!["id".to_string()];

    assert!(key_cast_schema(&reference, &same, &keys).is_none());

    let cast = key_cast_schema(&reference, &rescaled, &keys).unwrap();
    assert_eq!(cast.column_names(), vec!["id"]);
    assert_eq!(cast.type_of("id"), Some("DECIMAL(12,4)"));

    let cast = key_cast_schema(&reference, &different, &keys).unwrap();
    assert_eq!(cast.type_of("id"), Some("DECIMAL(12,4)"));
}
