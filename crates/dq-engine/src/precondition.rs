//! Named precondition checks and their registry
//!
//! A precondition gates a test case before any test logic runs. Each check
//! is a stateless predicate over a [`Checkable`]; it may attach a summary or
//! detail explaining its verdict and must not touch anything else.

use crate::error::PreconditionError;
use async_trait::async_trait;
use dq_core::specification::{count_of, find_unique};
use dq_core::{DomainConfig, SpecType, Specification, TestObject};
use dq_db::{Backend, DbResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Exactly one specification of every required type
pub const SPECS_ARE_UNIQUE: &str = "specs_are_unique";
/// The test object is listed by the backend
pub const TESTOBJECT_EXISTS: &str = "testobject_exists";
/// The test object has at least one row
pub const TESTOBJECT_NOT_EMPTY: &str = "testobject_not_empty";
/// The schema specification declares primary keys
pub const PRIMARY_KEYS_ARE_SPECIFIED: &str = "primary_keys_are_specified";
/// A positive sample size resolves for the test object
pub const SAMPLE_SIZE_IS_CONFIGURED: &str = "sample_size_is_configured";

/// What a precondition can see of a test case
pub trait Checkable: Send + Sync {
    /// Object under test
    fn test_object(&self) -> &TestObject;

    /// Data platform port
    fn backend(&self) -> &dyn Backend;

    /// Supplied specifications
    fn specs(&self) -> &[Specification];

    /// Specification types the test kind requires
    fn required_specs(&self) -> &[SpecType];

    /// Domain configuration
    fn config(&self) -> &DomainConfig;

    /// Record a human-readable explanation of the verdict
    fn set_summary(&mut self, summary: String);

    /// Attach a note under the check's name
    fn add_detail(&mut self, step: &str, message: String);
}

/// A single named check
#[async_trait]
pub trait Precondition: Send + Sync {
    /// Registered name
    fn name(&self) -> &'static str;

    /// Evaluate the check; `Ok(false)` is a failed check, `Err` means the
    /// check could not be evaluated.
    async fn check(&self, case: &mut dyn Checkable) -> DbResult<bool>;
}

/// Evaluates preconditions by name
///
/// The state machine only sees this trait, so tests can hand it a
/// substitute.
#[async_trait]
pub trait PreconditionChecker: Send + Sync {
    async fn check(&self, name: &str, case: &mut dyn Checkable)
        -> Result<bool, PreconditionError>;
}

/// Name-keyed set of checks
#[derive(Default, Clone)]
pub struct PreconditionRegistry {
    checks: HashMap<&'static str, Arc<dyn Precondition>>,
}

impl PreconditionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in check
    pub fn with_defaults() -> Self {
        let builtins: [Arc<dyn Precondition>; 5] = [
            Arc::new(SpecsAreUnique),
            Arc::new(TestObjectExists),
            Arc::new(TestObjectNotEmpty),
            Arc::new(PrimaryKeysAreSpecified),
            Arc::new(SampleSizeIsConfigured),
        ];
        let mut registry = Self::new();
        for check in builtins {
            registry.checks.insert(check.name(), check);
        }
        registry
    }

    /// Add a check; a name can only be registered once
    pub fn register(&mut self, check: Arc<dyn Precondition>) -> Result<(), PreconditionError> {
        let name = check.name();
        if self.checks.contains_key(name) {
            return Err(PreconditionError::Duplicate {
                name: name.to_string(),
            });
        }
        self.checks.insert(name, check);
        Ok(())
    }

    /// Swap the check registered under the same name, returning the old one
    pub fn replace(&mut self, check: Arc<dyn Precondition>) -> Option<Arc<dyn Precondition>> {
        self.checks.insert(check.name(), check)
    }

    /// Whether a check is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.checks.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl PreconditionChecker for PreconditionRegistry {
    async fn check(
        &self,
        name: &str,
        case: &mut dyn Checkable,
    ) -> Result<bool, PreconditionError> {
        let check = self
            .checks
            .get(name)
            .ok_or_else(|| PreconditionError::Unknown {
                name: name.to_string(),
            })?;

        check
            .check(case)
            .await
            .map_err(|source| PreconditionError::Backend {
                name: name.to_string(),
                source,
            })
    }
}

/// See [`SPECS_ARE_UNIQUE`]
pub struct SpecsAreUnique;

#[async_trait]
impl Precondition for SpecsAreUnique {
    fn name(&self) -> &'static str {
        SPECS_ARE_UNIQUE
    }

    async fn check(&self, case: &mut dyn Checkable) -> DbResult<bool> {
        let offender = case
            .required_specs()
            .iter()
            .map(|t| (*t, count_of(case.specs(), *t)))
            .find(|(_, n)| *n != 1);

        match offender {
            Some((spec_type, count)) => {
                case.set_summary(format!(
                    "expected exactly one {} specification, found {}",
                    spec_type, count
                ));
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

/// See [`TESTOBJECT_EXISTS`]
pub struct TestObjectExists;

#[async_trait]
impl Precondition for TestObjectExists {
    fn name(&self) -> &'static str {
        TESTOBJECT_EXISTS
    }

    async fn check(&self, case: &mut dyn Checkable) -> DbResult<bool> {
        let object = case.test_object().clone();
        let names = case.backend().list_objects(object.coordinates()).await?;

        if names.iter().any(|n| n.as_str() == object.name().as_str()) {
            Ok(true)
        } else {
            case.set_summary(format!(
                "test object '{}' not found in {}",
                object.name(),
                object.coordinates()
            ));
            Ok(false)
        }
    }
}

/// See [`TESTOBJECT_NOT_EMPTY`]
pub struct TestObjectNotEmpty;

#[async_trait]
impl Precondition for TestObjectNotEmpty {
    fn name(&self) -> &'static str {
        TESTOBJECT_NOT_EMPTY
    }

    async fn check(&self, case: &mut dyn Checkable) -> DbResult<bool> {
        let object = case.test_object().clone();
        let rows = case.backend().row_count(&object, None).await?;
        case.add_detail(TESTOBJECT_NOT_EMPTY, format!("{} rows", rows));

        if rows == 0 {
            case.set_summary(format!("test object '{}' is empty", object.name()));
            return Ok(false);
        }
        Ok(true)
    }
}

/// See [`PRIMARY_KEYS_ARE_SPECIFIED`]
pub struct PrimaryKeysAreSpecified;

#[async_trait]
impl Precondition for PrimaryKeysAreSpecified {
    fn name(&self) -> &'static str {
        PRIMARY_KEYS_ARE_SPECIFIED
    }

    async fn check(&self, case: &mut dyn Checkable) -> DbResult<bool> {
        let declared = find_unique(case.specs(), SpecType::Schema)
            .and_then(|s| s.as_schema())
            .map(|s| !s.primary_keys.is_empty())
            .unwrap_or(false);

        if !declared {
            case.set_summary("schema specification declares no primary keys".to_string());
        }
        Ok(declared)
    }
}

/// See [`SAMPLE_SIZE_IS_CONFIGURED`]
pub struct SampleSizeIsConfigured;

#[async_trait]
impl Precondition for SampleSizeIsConfigured {
    fn name(&self) -> &'static str {
        SAMPLE_SIZE_IS_CONFIGURED
    }

    async fn check(&self, case: &mut dyn Checkable) -> DbResult<bool> {
        let object = case.test_object().name().to_string();
        match case.config().compare.resolve_sample_size(&object) {
            Some((size, _)) if size > 0 => Ok(true),
            _ => {
                case.set_summary(format!("no sample size configured for '{}'", object));
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
#[path = "precondition_test.rs"]
mod tests;
