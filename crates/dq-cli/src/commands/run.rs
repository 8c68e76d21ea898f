//! Run command implementation

use anyhow::{Context, Result};
use dq_engine::{RunSummary, TestCaseRecord, TestRunner};
use serde::Serialize;

use crate::cli::{GlobalArgs, RunArgs, RunOutput};
use crate::context::{parse_selection, RuntimeContext};

/// Discrepancy rows echoed per failing test case in text output
const SAMPLE_DIFF_ROWS: usize = 5;

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let backend = ctx.backend()?;

    let runner = TestRunner::new(ctx.config.clone(), backend)
        .with_notifiers(ctx.notifiers())
        .with_source(ctx.source_name());

    let select = parse_selection(args.select.as_deref());
    let (records, summary) = runner
        .run_all(select.as_deref())
        .await
        .context("Failed to build test cases")?;

    if records.is_empty() {
        println!("No test cases to run.");
        return Ok(());
    }

    match args.output {
        RunOutput::Text => print_text(&records, &summary),
        RunOutput::Json => print_json(&records, &summary)?,
    }

    if !summary.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

/// Print one line per test case, with sample discrepancies for failures
fn print_text(records: &[TestCaseRecord], summary: &RunSummary) {
    let object_width = records
        .iter()
        .map(|r| r.test_object.to_string().len())
        .max()
        .unwrap_or(6);

    for record in records {
        println!(
            "{:<3}  {:<13}  {:<object_width$}  {}: {}",
            record.result.to_string(),
            record.status.to_string(),
            record.test_object.to_string(),
            record.id,
            record.summary,
            object_width = object_width
        );

        if let Some(diff) = &record.diff {
            println!("       {}", diff.columns.join(" | "));
            for row in diff.rows.iter().take(SAMPLE_DIFF_ROWS) {
                let cells: Vec<&str> = row
                    .iter()
                    .map(|cell| cell.as_deref().unwrap_or("NULL"))
                    .collect();
                println!("       {}", cells.join(" | "));
            }
            if diff.total_rows > SAMPLE_DIFF_ROWS {
                println!("       ... and {} more", diff.total_rows - SAMPLE_DIFF_ROWS);
            }
        }
    }

    println!();
    println!(
        "{} test cases: {} ok, {} nok, {} error, {} aborted [{}ms]",
        summary.total,
        summary.ok,
        summary.nok,
        summary.errors,
        summary.aborted,
        summary.duration.as_millis()
    );
}

#[derive(Serialize)]
struct JsonReport<'a> {
    total: usize,
    ok: usize,
    nok: usize,
    errors: usize,
    aborted: usize,
    duration_ms: u128,
    records: &'a [TestCaseRecord],
}

/// Print the full records as JSON
fn print_json(records: &[TestCaseRecord], summary: &RunSummary) -> Result<()> {
    let report = JsonReport {
        total: summary.total,
        ok: summary.ok,
        nok: summary.nok,
        errors: summary.errors,
        aborted: summary.aborted,
        duration_ms: summary.duration.as_millis(),
        records,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}
