//! Completed test-case records

use chrono::{DateTime, Utc};
use dq_core::{Status, TestObject, TestResult, TestType};
use dq_db::Cell;
use serde::Serialize;

/// A short labeled string for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub label: String,
    pub value: String,
}

/// A sub-step entry: precondition notes and step timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    /// Step or check name
    pub step: String,

    /// Human-readable message
    pub message: String,

    /// Duration in milliseconds, for timed steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Structured discrepancy payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffPayload {
    /// Column names of `rows`
    pub columns: Vec<String>,

    /// Example rows, capped
    pub rows: Vec<Vec<Cell>>,

    /// True number of discrepancy rows before capping
    pub total_rows: usize,

    /// Whether `rows` holds fewer than `total_rows`
    pub truncated: bool,
}

impl DiffPayload {
    /// Whether no discrepancy was found
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

/// The one record every test-case execution produces
#[derive(Debug, Clone, Serialize)]
pub struct TestCaseRecord {
    pub id: String,
    pub test_type: TestType,
    pub test_object: TestObject,
    pub status: Status,
    pub result: TestResult,
    pub summary: String,
    pub facts: Vec<Fact>,
    pub details: Vec<Detail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffPayload>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl TestCaseRecord {
    /// Whether the test case finished with an OK verdict
    pub fn is_ok(&self) -> bool {
        self.status == Status::Finished && self.result == TestResult::Ok
    }

    /// Value of the first fact with the given label
    pub fn fact(&self, label: &str) -> Option<&str> {
        self.facts
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}
