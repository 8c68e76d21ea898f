//! List command implementation

use anyhow::{Context, Result};
use dq_core::{TestDefinition, TestType};
use serde::Serialize;

use crate::cli::{GlobalArgs, LsArgs, LsOutput};
use crate::context::RuntimeContext;

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;

    let tests: Vec<TestInfo> = ctx
        .config
        .tests
        .iter()
        .map(|definition| TestInfo::new(definition, &ctx))
        .collect();

    match args.output {
        LsOutput::Table => print_table(&tests),
        LsOutput::Json => print_json(&tests)?,
    }

    Ok(())
}

/// Test case information for display
#[derive(Debug, Serialize)]
struct TestInfo {
    id: String,
    #[serde(rename = "type")]
    test_type: TestType,
    object: String,
    sample_size: Option<usize>,
}

impl TestInfo {
    fn new(definition: &TestDefinition, ctx: &RuntimeContext) -> Self {
        let sample_size = match definition.test_type {
            TestType::Compare => ctx
                .config
                .compare
                .resolve_sample_size(&definition.object)
                .map(|(size, _)| size),
            _ => None,
        };

        Self {
            id: definition.id(),
            test_type: definition.test_type,
            object: definition.test_object(&ctx.config).to_string(),
            sample_size,
        }
    }
}

/// Print test cases in table format
fn print_table(tests: &[TestInfo]) {
    let id_width = tests.iter().map(|t| t.id.len()).max().unwrap_or(2).max(2);
    let type_width = 8;
    let object_width = tests
        .iter()
        .map(|t| t.object.len())
        .max()
        .unwrap_or(6)
        .max(6);

    println!(
        "{:<id_width$}  {:<type_width$}  {:<object_width$}  SAMPLE",
        "ID",
        "TYPE",
        "OBJECT",
        id_width = id_width,
        type_width = type_width,
        object_width = object_width
    );
    println!(
        "{:-<id_width$}  {:-<type_width$}  {:-<object_width$}  {}",
        "",
        "",
        "",
        "-".repeat(6),
        id_width = id_width,
        type_width = type_width,
        object_width = object_width
    );

    for test in tests {
        let sample = test
            .sample_size
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<id_width$}  {:<type_width$}  {:<object_width$}  {}",
            test.id,
            test.test_type.to_string(),
            test.object,
            sample,
            id_width = id_width,
            type_width = type_width,
            object_width = object_width
        );
    }

    println!();
    println!("{} test cases found", tests.len());
}

/// Print test cases in JSON format
fn print_json(tests: &[TestInfo]) -> Result<()> {
    let json = serde_json::to_string_pretty(tests).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}
