use super::*;
use crate::error::{EngineError, ErrorKind, PreconditionError};
use crate::precondition::PreconditionRegistry;
use crate::testing::{RecordingNotifier, StaticBackend};
use dq_core::Coordinates;
use dq_db::DbError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const CHECKS: &[&str] = &["first", "second", "third"];

#[derive(Clone, Copy)]
enum Behaviour {
    Ok,
    Nok,
    BackendFailure,
    KeysMissing,
}

struct StubKind {
    behaviour: Behaviour,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl TestKind for StubKind {
    fn test_type(&self) -> TestType {
        TestType::Compare
    }

    fn preconditions(&self) -> &'static [&'static str] {
        CHECKS
    }

    fn required_specs(&self) -> &'static [SpecType] {
        &[]
    }

    async fn execute(&self, case: &mut TestCase) -> EngineResult<Outcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        case.add_fact("stub", "ran");
        match self.behaviour {
            Behaviour::Ok => Ok(Outcome::ok("all good")),
            Behaviour::Nok => Ok(Outcome::nok("2 rows differ")),
            Behaviour::BackendFailure => Err(EngineError::QueryExecution(
                DbError::ExecutionError("connection lost".to_string()),
            )),
            Behaviour::KeysMissing => Err(EngineError::PrimaryKeysMissing {
                location: "dq.yml#tests[0].compare_sql".to_string(),
                missing: vec!["id".to_string()],
            }),
        }
    }
}

/// Passes every check except `failing`; `unknown` is reported as unregistered
#[derive(Default)]
struct ScriptedChecker {
    failing: Option<&'static str>,
    unknown: Option<&'static str>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedChecker {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PreconditionChecker for ScriptedChecker {
    async fn check(
        &self,
        name: &str,
        case: &mut dyn Checkable,
    ) -> Result<bool, PreconditionError> {
        self.seen.lock().unwrap().push(name.to_string());
        if self.unknown == Some(name) {
            return Err(PreconditionError::Unknown {
                name: name.to_string(),
            });
        }
        if self.failing == Some(name) {
            case.set_summary("scripted failure".to_string());
            return Ok(false);
        }
        Ok(true)
    }
}

fn stub_case(behaviour: Behaviour) -> (TestCase, Arc<AtomicUsize>, Arc<RecordingNotifier>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let notifier = Arc::new(RecordingNotifier::default());
    let case = TestCase::new(
        "compare_orders",
        TestObject::new(Coordinates::new("sales", "core", "dev"), "orders"),
        Vec::new(),
        Arc::new(DomainConfig::parse("domain: sales").unwrap()),
        Arc::new(StaticBackend::new()),
        Arc::new(StubKind {
            behaviour,
            runs: runs.clone(),
        }),
    )
    .with_notifiers(Notifiers::new().with(notifier.clone()));
    (case, runs, notifier)
}

fn assert_terminal_invariants(record: &TestCaseRecord) {
    assert!(record.status.is_terminal());
    if record.status != Status::Finished {
        assert_eq!(record.result, TestResult::Na);
    }
}

#[test]
fn test_new_case_is_initiated() {
    let (case, _, _) = stub_case(Behaviour::Ok);
    assert_eq!(case.status(), Status::Initiated);
    assert_eq!(case.test_type(), TestType::Compare);
}

#[tokio::test]
async fn test_all_preconditions_pass() {
    let (case, runs, notifier) = stub_case(Behaviour::Ok);
    let checker = ScriptedChecker::default();

    let record = case.execute(&checker).await;

    assert_eq!(record.status, Status::Finished);
    assert_eq!(record.result, TestResult::Ok);
    assert_eq!(record.summary, "all good");
    assert_eq!(record.fact("stub"), Some("ran"));
    assert_eq!(checker.seen(), vec!["first", "second", "third"]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_terminal_invariants(&record);

    let messages = notifier.messages();
    for status in ["PRECONDITIONS", "EXECUTING", "FINISHED"] {
        assert!(messages.iter().any(|m| m.ends_with(status)), "{status}");
    }
    assert!(messages
        .iter()
        .any(|m| m.contains("checking precondition 'second'")));
}

#[tokio::test]
async fn test_nok_verdict_finishes() {
    let (case, _, _) = stub_case(Behaviour::Nok);
    let record = case.execute(&ScriptedChecker::default()).await;

    assert_eq!(record.status, Status::Finished);
    assert_eq!(record.result, TestResult::Nok);
    assert_eq!(record.summary, "2 rows differ");
}

#[tokio::test]
async fn test_failed_precondition_aborts() {
    let (case, runs, _) = stub_case(Behaviour::Ok);
    let checker = ScriptedChecker {
        failing: Some("second"),
        ..Default::default()
    };

    let record = case.execute(&checker).await;

    assert_eq!(record.status, Status::Aborted);
    assert_eq!(record.result, TestResult::Na);
    assert_eq!(
        record.summary,
        "precondition 'second' failed: scripted failure"
    );
    assert_eq!(checker.seen(), vec!["first", "second"]);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(record.facts.is_empty());
    assert_terminal_invariants(&record);
}

#[tokio::test]
async fn test_unknown_precondition_errors() {
    let (case, runs, _) = stub_case(Behaviour::Ok);
    let checker = ScriptedChecker {
        unknown: Some("first"),
        ..Default::default()
    };

    let record = case.execute(&checker).await;

    assert_eq!(record.status, Status::Error);
    assert_eq!(record.result, TestResult::Na);
    assert!(record.summary.contains("P001"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unregistered_names_in_real_registry_error() {
    let (case, _, _) = stub_case(Behaviour::Ok);
    let record = case.execute(&PreconditionRegistry::with_defaults()).await;

    assert_eq!(record.status, Status::Error);
    assert!(record.summary.contains("Unknown precondition 'first'"));
}

#[tokio::test]
async fn test_backend_failure_errors() {
    let (case, _, _) = stub_case(Behaviour::BackendFailure);
    let record = case.execute(&ScriptedChecker::default()).await;

    assert_eq!(record.status, Status::Error);
    assert_eq!(record.result, TestResult::Na);
    assert!(record.summary.starts_with(&ErrorKind::Backend.to_string()));
    assert!(record.summary.contains("connection lost"));
    assert_terminal_invariants(&record);
}

#[tokio::test]
async fn test_specification_defect_errors() {
    let (case, _, _) = stub_case(Behaviour::KeysMissing);
    let record = case.execute(&ScriptedChecker::default()).await;

    assert_eq!(record.status, Status::Error);
    assert_eq!(record.result, TestResult::Na);
    assert!(record
        .summary
        .starts_with(&ErrorKind::SpecificationDefect.to_string()));
    assert!(record.summary.contains("T001"));
}

#[tokio::test]
async fn test_every_path_ends_terminal() {
    let scenarios = [
        (Behaviour::Ok, None),
        (Behaviour::Nok, None),
        (Behaviour::BackendFailure, None),
        (Behaviour::KeysMissing, None),
        (Behaviour::Ok, Some("first")),
        (Behaviour::Ok, Some("third")),
    ];

    for (behaviour, failing) in scenarios {
        let (case, _, _) = stub_case(behaviour);
        let checker = ScriptedChecker {
            failing,
            ..Default::default()
        };
        let record = case.execute(&checker).await;
        assert_terminal_invariants(&record);
        assert!(record.finished_at >= record.started_at);
    }
}

#[test]
fn test_error_kinds_are_distinct() {
    let defect = EngineError::PrimaryKeysMissing {
        location: "test object".to_string(),
        missing: vec!["id".to_string(), "region".to_string()],
    };
    let backend = EngineError::QueryExecution(DbError::ExecutionError("boom".to_string()));

    assert_eq!(defect.kind(), ErrorKind::SpecificationDefect);
    assert_eq!(backend.kind(), ErrorKind::Backend);
    assert_ne!(defect.kind(), backend.kind());
    assert_eq!(
        defect.to_string(),
        "[T001] Primary keys missing from test object: id, region"
    );
}
