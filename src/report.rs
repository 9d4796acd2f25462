// src/report.rs
//! Console and JSON rendering of a run.

use crate::errors::Result;
use crate::models::ResultTable;
use crate::runner::{EvalUpdate, excerpt};
use crate::summary::Summary;
use serde::Serialize;
use std::io::Write;

const COMMAND_PREVIEW_CHARS: usize = 60;

/// Lines printed for one progress update.
pub fn format_update(update: &EvalUpdate<'_>) -> Vec<String> {
    match update {
        EvalUpdate::Started { id, question_id } => vec![
            String::new(),
            format!("📋 Testing: {}", id),
            format!("   Question: {}", question_id.unwrap_or("-")),
        ],
        EvalUpdate::Running { command } => vec![format!(
            "  Running: {}...",
            excerpt(command, COMMAND_PREVIEW_CHARS)
        )],
        EvalUpdate::Finished { result, .. } => {
            let status = result.status();
            let mut lines = vec![format!("   {} {}", status.emoji(), status)];
            if let Some(detail) = result.detail() {
                lines.push(format!("      {}", detail));
            }
            lines
        }
    }
}

pub fn write_update<W: Write>(out: &mut W, update: &EvalUpdate<'_>) -> std::io::Result<()> {
    for line in format_update(update) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Mirrors progress into the log instead of stdout.
pub fn log_update(update: EvalUpdate<'_>) {
    match update {
        EvalUpdate::Started { id, question_id } => {
            log::info!("Testing {} (question {})", id, question_id.unwrap_or("-"))
        }
        EvalUpdate::Running { command } => log::debug!("Running: {}", command),
        EvalUpdate::Finished { id, result } => log::info!("{} -> {}", id, result.status()),
    }
}

pub fn render_summary(summary: &Summary) -> String {
    let separator = "=".repeat(60);
    let verdict = if summary.has_failures() {
        "❌ Some tests failed. Review output above."
    } else {
        "✅ All tests passed!"
    };

    format!(
        "\n{sep}\n📊 EVAL SUMMARY\n{sep}\nTotal:   {}\n✅ Pass:  {}\n❌ Fail:  {}\n⚠️  Error: {}\n⏭️  Skip:  {}\n{sep}\n\n{}",
        summary.total,
        summary.passed,
        summary.failed,
        summary.errors,
        summary.skipped,
        verdict,
        sep = separator,
    )
}

/// Machine-readable view of a finished run.
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub timestamp: String,
    pub repo_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
    pub summary: Summary,
    pub exit_code: i32,
    pub results: &'a ResultTable,
}

impl<'a> RunReport<'a> {
    pub fn new(
        repo_root: &std::path::Path,
        filter: Option<&'a str>,
        results: &'a ResultTable,
    ) -> Self {
        let summary = Summary::from_table(results);
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            repo_root: repo_root.display().to_string(),
            filter,
            exit_code: summary.exit_code(),
            summary,
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
