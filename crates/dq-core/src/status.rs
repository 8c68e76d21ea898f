//! Test-case lifecycle status and verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a test case.
///
/// `NotStarted -> Initiated -> Preconditions -> Executing -> {Finished | Error}`,
/// with `Preconditions -> Aborted` when a precondition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Constructed, nothing run yet
    #[default]
    NotStarted,
    /// Bound to its backend and ready to execute
    Initiated,
    /// Evaluating preconditions
    Preconditions,
    /// Running test-type specific logic
    Executing,
    /// Completed with a verdict
    Finished,
    /// A technical failure stopped execution
    Error,
    /// A precondition failed
    Aborted,
}

impl Status {
    /// Whether this is a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Finished | Status::Error | Status::Aborted)
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::NotStarted, Status::Initiated)
                | (Status::Initiated, Status::Preconditions)
                | (Status::Preconditions, Status::Executing)
                | (Status::Preconditions, Status::Aborted)
                | (Status::Preconditions, Status::Error)
                | (Status::Executing, Status::Finished)
                | (Status::Executing, Status::Error)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::NotStarted => "NOT_STARTED",
            Status::Initiated => "INITIATED",
            Status::Preconditions => "PRECONDITIONS",
            Status::Executing => "EXECUTING",
            Status::Finished => "FINISHED",
            Status::Error => "ERROR",
            Status::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// Verdict of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TestResult {
    /// No verdict (aborted, errored, or not yet run)
    #[default]
    #[serde(rename = "NA")]
    Na,
    /// Verified
    #[serde(rename = "OK")]
    Ok,
    /// Discrepancy found
    #[serde(rename = "NOK")]
    Nok,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Na => write!(f, "NA"),
            TestResult::Ok => write!(f, "OK"),
            TestResult::Nok => write!(f, "NOK"),
        }
    }
}

/// Kind of test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// Schema check
    Schema,
    /// Row-count check
    RowCount,
    /// Sample-based content comparison
    Compare,
}

impl TestType {
    /// Parse a test type tag
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "schema" => Some(TestType::Schema),
            "rowcount" | "row_count" => Some(TestType::RowCount),
            "compare" => Some(TestType::Compare),
            _ => None,
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::Schema => write!(f, "schema"),
            TestType::RowCount => write!(f, "rowcount"),
            TestType::Compare => write!(f, "compare"),
        }
    }
}
