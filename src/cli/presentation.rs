//! CLI presentation: text and json formatters for dispatch results.

use crate::cli::parse::OutputFormat;
use crate::dispatch::{DispatchSummary, JobOutcome, JobStatus};
use crate::error::ApiError;
use serde_json::{json, Value};

fn file_label(outcome: &JobOutcome) -> String {
    outcome
        .settings_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| outcome.settings_path.display().to_string())
}

pub fn format_outcome_text(outcome: &JobOutcome) -> String {
    let endpoint = outcome.endpoint.as_deref().unwrap_or("-");
    let detail = match &outcome.status {
        JobStatus::Completed(report) => {
            let mut s = format!(
                "completed: {} generations, {} failed, {} images",
                report.generations_attempted,
                report.generations_failed,
                report.images_written.len()
            );
            if !report.model_selected {
                s.push_str(", model not confirmed");
            }
            if report.exhausted_prompts > 0 {
                s.push_str(&format!(
                    ", seeds exhausted for {} prompt(s)",
                    report.exhausted_prompts
                ));
            }
            s
        }
        JobStatus::Aborted(e) => format!("aborted: {}", e),
        JobStatus::Skipped(e) => format!("skipped: {}", e),
    };
    format!("  {} [{}] {}", file_label(outcome), endpoint, detail)
}

pub fn format_dispatch_summary_text(summary: &DispatchSummary) -> String {
    let mut lines = vec![format!(
        "Dispatch finished: {} completed, {} aborted, {} skipped, {} images written",
        summary.completed(),
        summary.aborted(),
        summary.skipped(),
        summary.images_written()
    )];
    lines.extend(summary.outcomes.iter().map(format_outcome_text));
    lines.join("\n")
}

fn outcome_json(outcome: &JobOutcome) -> Value {
    let (status, detail) = match &outcome.status {
        JobStatus::Completed(report) => (
            "completed",
            json!({
                "model_selected": report.model_selected,
                "generations_attempted": report.generations_attempted,
                "generations_failed": report.generations_failed,
                "images_written": report.images_written,
                "exhausted_prompts": report.exhausted_prompts,
            }),
        ),
        JobStatus::Aborted(e) => ("aborted", json!({ "reason": e.to_string() })),
        JobStatus::Skipped(e) => ("skipped", json!({ "reason": e.to_string() })),
    };
    json!({
        "settings": outcome.settings_path,
        "endpoint": outcome.endpoint,
        "status": status,
        "detail": detail,
    })
}

pub fn format_dispatch_summary_json(summary: &DispatchSummary) -> Result<String, ApiError> {
    let out = json!({
        "completed": summary.completed(),
        "aborted": summary.aborted(),
        "skipped": summary.skipped(),
        "images_written": summary.images_written(),
        "jobs": summary.outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&out)
        .map_err(|e| ApiError::RunFailed(format!("Failed to render summary: {}", e)))
}

pub fn format_dispatch_summary(
    summary: &DispatchSummary,
    format: OutputFormat,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => format_dispatch_summary_json(summary),
        OutputFormat::Text => Ok(format_dispatch_summary_text(summary)),
    }
}
