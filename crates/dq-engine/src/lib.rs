//! dq-engine - Test execution engine for dq
//!
//! This crate provides the test-case state machine, the precondition
//! registry, the sample-based comparison of a reference query against a
//! test object, and schema harmonization.

pub mod align;
pub mod coerce;
pub mod diff;
pub mod error;
pub mod harmonize;
pub mod kinds;
pub mod notify;
pub mod precondition;
pub mod record;
pub mod registry;
pub mod runner;
pub mod test_case;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{EngineError, EngineResult, ErrorKind, PreconditionError};
pub use harmonize::{harmonize, harmonize_type};
pub use kinds::{CompareKind, RowCountKind, SchemaKind};
pub use notify::{ConsoleNotifier, LogNotifier, Notifier, Notifiers};
pub use precondition::{Checkable, Precondition, PreconditionChecker, PreconditionRegistry};
pub use record::{Detail, DiffPayload, Fact, TestCaseRecord};
pub use registry::TestKindRegistry;
pub use runner::{RunSummary, TestRunner};
pub use test_case::{Outcome, TestCase, TestKind};
