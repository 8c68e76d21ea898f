//! Error types for dq-engine

use dq_core::{SpecType, TestType};
use dq_db::DbError;
use std::fmt;
use thiserror::Error;

/// Failures raised while executing a test case.
///
/// The state machine turns every one of these into a completed record with
/// status `ERROR`; they never escape `TestCase::execute`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// T001: Declared primary keys are not columns of the compared data
    #[error("[T001] Primary keys missing from {location}: {}", .missing.join(", "))]
    PrimaryKeysMissing {
        location: String,
        missing: Vec<String>,
    },

    /// T002: The data platform failed to run a query
    #[error("[T002] Query execution failed: {0}")]
    QueryExecution(#[from] DbError),

    /// T003: A required specification is absent
    #[error("[T003] Missing {0} specification")]
    MissingSpecification(SpecType),

    /// T004: Configuration does not allow the test to run
    #[error("[T004] Invalid configuration: {0}")]
    Configuration(String),

    /// T005: A query returned something the test cannot interpret
    #[error("[T005] Unexpected query result: {0}")]
    UnexpectedResult(String),

    /// T006: A test type was registered twice
    #[error("[T006] Test type '{0}' is already registered")]
    DuplicateRegistration(TestType),

    /// T007: No test kind registered for a test type
    #[error("[T007] No test kind registered for '{0}'")]
    UnregisteredTestType(TestType),
}

/// Broad category of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The specification is wrong (authoring bug)
    SpecificationDefect,
    /// The data platform failed at runtime
    Backend,
    /// The engine or domain is misconfigured
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SpecificationDefect => write!(f, "specification defect"),
            ErrorKind::Backend => write!(f, "backend error"),
            ErrorKind::Configuration => write!(f, "configuration error"),
        }
    }
}

impl EngineError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::PrimaryKeysMissing { .. } | EngineError::MissingSpecification(_) => {
                ErrorKind::SpecificationDefect
            }
            EngineError::QueryExecution(_) | EngineError::UnexpectedResult(_) => {
                ErrorKind::Backend
            }
            EngineError::Configuration(_)
            | EngineError::DuplicateRegistration(_)
            | EngineError::UnregisteredTestType(_) => ErrorKind::Configuration,
        }
    }
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of the precondition machinery itself (not failed checks)
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// P001: No check registered under this name
    #[error("[P001] Unknown precondition '{name}'")]
    Unknown { name: String },

    /// P002: A check name was registered twice
    #[error("[P002] Precondition '{name}' is already registered")]
    Duplicate { name: String },

    /// P003: The check could not reach the data platform
    #[error("[P003] Precondition '{name}' could not be evaluated: {source}")]
    Backend {
        name: String,
        #[source]
        source: DbError,
    },
}
