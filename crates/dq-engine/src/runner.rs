//! Test execution

use crate::error::EngineResult;
use crate::notify::Notifiers;
use crate::precondition::{PreconditionChecker, PreconditionRegistry};
use crate::record::TestCaseRecord;
use crate::registry::TestKindRegistry;
use crate::test_case::TestCase;
use dq_core::{DomainConfig, Status, TestResult};
use dq_db::Backend;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Summary of a test run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Test cases run
    pub total: usize,

    /// Finished with OK
    pub ok: usize,

    /// Finished with NOK
    pub nok: usize,

    /// Ended in ERROR
    pub errors: usize,

    /// Ended ABORTED
    pub aborted: usize,

    /// Total execution time
    pub duration: Duration,
}

impl RunSummary {
    /// Create a summary from test-case records
    pub fn from_records(records: &[TestCaseRecord], duration: Duration) -> Self {
        let count = |status: Status, result: Option<TestResult>| {
            records
                .iter()
                .filter(|r| r.status == status && result.map_or(true, |res| r.result == res))
                .count()
        };

        Self {
            total: records.len(),
            ok: count(Status::Finished, Some(TestResult::Ok)),
            nok: count(Status::Finished, Some(TestResult::Nok)),
            errors: count(Status::Error, None),
            aborted: count(Status::Aborted, None),
            duration,
        }
    }

    /// Check if every test case verified OK
    pub fn all_passed(&self) -> bool {
        self.ok == self.total
    }
}

/// Builds test cases from a domain configuration and runs them one by one
pub struct TestRunner {
    config: Arc<DomainConfig>,
    backend: Arc<dyn Backend>,
    kinds: TestKindRegistry,
    checker: Arc<dyn PreconditionChecker>,
    notifiers: Notifiers,
    source: String,
}

impl TestRunner {
    /// Create a runner with the default test kinds and preconditions
    pub fn new(config: Arc<DomainConfig>, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            backend,
            kinds: TestKindRegistry::with_defaults(),
            checker: Arc::new(PreconditionRegistry::with_defaults()),
            notifiers: Notifiers::default(),
            source: "dq.yml".to_string(),
        }
    }

    /// Use a different test-kind registry
    pub fn with_kinds(mut self, kinds: TestKindRegistry) -> Self {
        self.kinds = kinds;
        self
    }

    /// Use a different precondition checker
    pub fn with_checker(mut self, checker: Arc<dyn PreconditionChecker>) -> Self {
        self.checker = checker;
        self
    }

    /// Set the notification sinks handed to every test case
    pub fn with_notifiers(mut self, notifiers: Notifiers) -> Self {
        self.notifiers = notifiers;
        self
    }

    /// Name of the configuration file, used in specification locations
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Build the test cases declared in the configuration.
    ///
    /// With `select`, only tests whose id or object name is listed are
    /// built.
    pub fn build_cases(&self, select: Option<&[String]>) -> EngineResult<Vec<TestCase>> {
        let mut cases = Vec::new();

        for (i, definition) in self.config.tests.iter().enumerate() {
            let id = definition.id();
            if let Some(select) = select {
                if !select.iter().any(|s| *s == id || *s == definition.object) {
                    continue;
                }
            }

            let kind = self.kinds.create(definition.test_type)?;
            let test_object = definition.test_object(&self.config);
            let location = format!("{}#tests[{}]", self.source, i);
            let specs = definition.specifications(&test_object, &location);

            cases.push(
                TestCase::new(
                    id,
                    test_object,
                    specs,
                    Arc::clone(&self.config),
                    Arc::clone(&self.backend),
                    kind,
                )
                .with_notifiers(self.notifiers.clone()),
            );
        }

        log::debug!("Built {} test case(s)", cases.len());
        Ok(cases)
    }

    /// Run a single test case
    pub async fn run_case(&self, case: TestCase) -> TestCaseRecord {
        log::info!("Running {} test '{}'", case.test_type(), case.id());
        let record = case.execute(self.checker.as_ref()).await;
        log::info!(
            "Test '{}' ended {} with {}",
            record.id,
            record.status,
            record.result
        );
        record
    }

    /// Run test cases sequentially
    pub async fn run_cases(&self, cases: Vec<TestCase>) -> Vec<TestCaseRecord> {
        let mut records = Vec::with_capacity(cases.len());

        for case in cases {
            let record = self.run_case(case).await;
            records.push(record);
        }

        records
    }

    /// Build and run the selected tests and return their summary
    pub async fn run_all(
        &self,
        select: Option<&[String]>,
    ) -> EngineResult<(Vec<TestCaseRecord>, RunSummary)> {
        let start = Instant::now();
        let cases = self.build_cases(select)?;
        let records = self.run_cases(cases).await;
        let summary = RunSummary::from_records(&records, start.elapsed());

        Ok((records, summary))
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
