// Console summary of a scrape run
use crate::application::scrape_service::{RunFailure, RunReport};
use std::process::ExitCode;

pub fn render_report(report: &RunReport) -> String {
    let mut lines = Vec::new();

    match &report.header {
        Some(title) => lines.push(format!("✅ Report: {}", title)),
        None => lines.push("⚠️ Report header not found".to_string()),
    }
    if let Some(table) = &report.table {
        lines.push(format!(
            "✅ {} table rows saved to {}",
            report.table_rows,
            table.display()
        ));
    }
    lines.push(format!("ℹ️ Legend items found: {}", report.legend_items));

    for snapshot in &report.snapshots {
        lines.push(format!(
            "✅ Snapshot {}: {} + {}",
            snapshot.index,
            snapshot.csv.display(),
            snapshot.screenshot.display()
        ));
    }
    for item in &report.unchanged_items {
        lines.push(format!("⚠️ Filter #{} did not change the chart", item));
    }
    for failure in &report.item_failures {
        lines.push(format!("❌ Error applying filter #{}: {}", failure.item, failure.error));
    }

    if let Some(finished) = report.finished_at {
        let elapsed = finished - report.started_at;
        lines.push(format!("⏱️ Finished in {} ms", elapsed.num_milliseconds()));
    }

    lines.join("\n")
}

pub fn print_report(report: &RunReport) {
    println!("{}", render_report(report));
}

pub fn print_failure(failure: &RunFailure) {
    eprintln!("❌ {}", failure);
    eprintln!("{}", render_report(&failure.report));
}

/// Print the run outcome once and map it to the process exit status
pub fn report_outcome(outcome: &Result<RunReport, RunFailure>) -> ExitCode {
    match outcome {
        Ok(report) => {
            print_report(report);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            print_failure(failure);
            ExitCode::FAILURE
        }
    }
}
