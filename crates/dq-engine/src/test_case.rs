//! Test-case lifecycle state machine
//!
//! A [`TestCase`] runs once: it gates on the preconditions its kind
//! declares, delegates to the kind's execution routine, and always ends in
//! a [`TestCaseRecord`] with a terminal status.

use crate::error::EngineResult;
use crate::notify::Notifiers;
use crate::precondition::{Checkable, PreconditionChecker};
use crate::record::{Detail, DiffPayload, Fact, TestCaseRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dq_core::{DomainConfig, SpecType, Specification, Status, TestObject, TestResult, TestType};
use dq_db::Backend;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Verdict of a successful execution routine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    result: TestResult,
    summary: String,
}

impl Outcome {
    /// Verified
    pub fn ok(summary: impl Into<String>) -> Self {
        Self {
            result: TestResult::Ok,
            summary: summary.into(),
        }
    }

    /// Discrepancy found
    pub fn nok(summary: impl Into<String>) -> Self {
        Self {
            result: TestResult::Nok,
            summary: summary.into(),
        }
    }

    /// The verdict
    pub fn result(&self) -> TestResult {
        self.result
    }

    /// The summary
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Test-type specific behavior plugged into the state machine
#[async_trait]
pub trait TestKind: Send + Sync {
    /// Type tag
    fn test_type(&self) -> TestType;

    /// Precondition names, evaluated in this order
    fn preconditions(&self) -> &'static [&'static str];

    /// Specification types that must each be present exactly once
    fn required_specs(&self) -> &'static [SpecType];

    /// Run the test logic. Only reached after every precondition passed.
    async fn execute(&self, case: &mut TestCase) -> EngineResult<Outcome>;
}

/// One test verification
pub struct TestCase {
    id: String,
    test_object: TestObject,
    specs: Vec<Specification>,
    config: Arc<DomainConfig>,
    backend: Arc<dyn Backend>,
    kind: Arc<dyn TestKind>,
    notifiers: Notifiers,
    seed: u64,
    status: Status,
    result: TestResult,
    summary: String,
    facts: Vec<Fact>,
    details: Vec<Detail>,
    diff: Option<DiffPayload>,
}

impl TestCase {
    /// Create a test case bound to its backend; it starts out `INITIATED`
    pub fn new(
        id: impl Into<String>,
        test_object: TestObject,
        specs: Vec<Specification>,
        config: Arc<DomainConfig>,
        backend: Arc<dyn Backend>,
        kind: Arc<dyn TestKind>,
    ) -> Self {
        let mut case = Self {
            id: id.into(),
            test_object,
            specs,
            config,
            backend,
            kind,
            notifiers: Notifiers::default(),
            seed: Uuid::new_v4().as_u64_pair().0,
            status: Status::NotStarted,
            result: TestResult::Na,
            summary: String::new(),
            facts: Vec::new(),
            details: Vec::new(),
            diff: None,
        };
        case.transition(Status::Initiated);
        case
    }

    /// Set the notification sinks
    pub fn with_notifiers(mut self, notifiers: Notifiers) -> Self {
        self.notifiers = notifiers;
        self
    }

    /// Fix the sampling seed (defaults to a fresh random value)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Test case id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Test type of the plugged-in kind
    pub fn test_type(&self) -> TestType {
        self.kind.test_type()
    }

    /// Current lifecycle state
    pub fn status(&self) -> Status {
        self.status
    }

    /// Run-scoped sampling seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Shared handle to the backend, for use across mutations of the case
    pub fn shared_backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// Current summary
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Facts recorded so far
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Details recorded so far
    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    /// Record a labeled fact
    pub fn add_fact(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.facts.push(Fact {
            label: label.into(),
            value: value.into(),
        });
    }

    /// Record how long a step took, and relay it to the sinks
    pub fn record_timing(&mut self, step: &str, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        self.details.push(Detail {
            step: step.to_string(),
            message: format!("took {} ms", ms),
            duration_ms: Some(ms),
        });
        self.notify(&format!("{}: {} took {} ms", self.id, step, ms));
    }

    /// Attach the discrepancy payload
    pub fn set_diff(&mut self, diff: DiffPayload) {
        self.diff = Some(diff);
    }

    /// Relay a message to every sink
    pub fn notify(&self, message: &str) {
        self.notifiers.notify(message);
    }

    /// Run the test case to completion.
    ///
    /// Never fails: precondition failures end `ABORTED`, technical failures
    /// end `ERROR`, and both leave the result `NA`.
    pub async fn execute(mut self, checker: &dyn PreconditionChecker) -> TestCaseRecord {
        let started_at = Utc::now();
        let start = Instant::now();

        self.run(checker).await;

        debug_assert!(self.status.is_terminal());
        debug_assert!(self.status == Status::Finished || self.result == TestResult::Na);
        self.into_record(started_at, Utc::now(), start.elapsed())
    }

    async fn run(&mut self, checker: &dyn PreconditionChecker) {
        self.transition(Status::Preconditions);

        let kind = Arc::clone(&self.kind);
        for name in kind.preconditions() {
            self.notify(&format!("{}: checking precondition '{}'", self.id, name));
            self.summary.clear();

            match checker.check(name, self).await {
                Ok(true) => {
                    self.notify(&format!("{}: precondition '{}' passed", self.id, name));
                }
                Ok(false) => {
                    self.notify(&format!("{}: precondition '{}' failed", self.id, name));
                    let reason = std::mem::take(&mut self.summary);
                    self.summary = if reason.is_empty() {
                        format!("precondition '{}' failed", name)
                    } else {
                        format!("precondition '{}' failed: {}", name, reason)
                    };
                    self.result = TestResult::Na;
                    self.transition(Status::Aborted);
                    return;
                }
                Err(e) => {
                    log::error!("Test case '{}': {}", self.id, e);
                    self.fail(format!("precondition '{}' could not run: {}", name, e));
                    return;
                }
            }
        }

        self.summary.clear();
        self.transition(Status::Executing);

        match kind.execute(self).await {
            Ok(outcome) => {
                self.result = outcome.result;
                self.summary = outcome.summary;
                self.transition(Status::Finished);
            }
            Err(e) => {
                log::warn!("Test case '{}' failed: {}", self.id, e);
                self.fail(format!("{}: {}", e.kind(), e));
            }
        }
    }

    fn fail(&mut self, summary: String) {
        self.result = TestResult::Na;
        self.summary = summary;
        self.transition(Status::Error);
    }

    fn transition(&mut self, next: Status) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {}",
            self.status,
            next
        );
        log::debug!("Test case '{}': {} -> {}", self.id, self.status, next);
        self.status = next;
        self.notify(&format!("{}: {}", self.id, next));
    }

    fn into_record(
        self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> TestCaseRecord {
        TestCaseRecord {
            test_type: self.kind.test_type(),
            id: self.id,
            test_object: self.test_object,
            status: self.status,
            result: self.result,
            summary: self.summary,
            facts: self.facts,
            details: self.details,
            diff: self.diff,
            started_at,
            finished_at,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

impl Checkable for TestCase {
    fn test_object(&self) -> &TestObject {
        &self.test_object
    }

    fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    fn specs(&self) -> &[Specification] {
        &self.specs
    }

    fn required_specs(&self) -> &[SpecType] {
        self.kind.required_specs()
    }

    fn config(&self) -> &DomainConfig {
        &self.config
    }

    fn set_summary(&mut self, summary: String) {
        self.summary = summary;
    }

    fn add_detail(&mut self, step: &str, message: String) {
        self.details.push(Detail {
            step: step.to_string(),
            message,
            duration_ms: None,
        });
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("test_object", &self.test_object)
            .field("test_type", &self.kind.test_type())
            .field("status", &self.status)
            .field("result", &self.result)
            .finish()
    }
}

#[cfg(test)]
#[path = "test_case_test.rs"]
mod tests;
