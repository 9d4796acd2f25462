// src/app.rs
//! One harness run, from command-line options to a process exit status.

use crate::config::HarnessConfig;
use crate::errors::{HarnessError, Result};
use crate::report::{self, RunReport};
use crate::runner::EvalExecutor;
use crate::source::AnswerSource;
use crate::{banner, summary};
use clap::ValueEnum;
use std::io::Write;
use std::path::PathBuf;

/// Exit status when the harness itself could not run.
pub const HARNESS_FAILURE_EXIT: u8 = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Overrides given on the command line.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub answer_id: Option<String>,
    pub repo_root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub format: OutputFormat,
}

impl RunOptions {
    /// Answer id to filter to. An empty id means no filter.
    pub fn filter(&self) -> Option<&str> {
        self.answer_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn apply(&self, mut config: HarnessConfig) -> Result<HarnessConfig> {
        if let Some(root) = &self.repo_root {
            config = config.with_repo_root(root.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs)?;
        }
        Ok(config)
    }
}

/// Runs every selected answer and writes the report to `out`.
///
/// Returns the summary exit code (0 or 1).
pub async fn run<W: Write>(
    config: HarnessConfig,
    options: &RunOptions,
    out: &mut W,
) -> Result<i32> {
    let config = options.apply(config)?;
    let filter = options.filter();
    let entries = AnswerSource::new(config.answers_root()).entries()?;
    let executor = EvalExecutor::new(config);

    match options.format {
        OutputFormat::Text => {
            banner::write_banner(out, &executor.config().repo_root, filter)
                .map_err(HarnessError::Output)?;
            let results = executor
                .run_all_evals(entries, filter, |update| {
                    if let Err(e) = report::write_update(out, &update) {
                        log::warn!("Failed to write progress: {}", e);
                    }
                })
                .await;
            let (summary, code) = summary::summarize(&results);
            writeln!(out, "{}", report::render_summary(&summary))
                .map_err(HarnessError::Output)?;
            Ok(code)
        }
        OutputFormat::Json => {
            let results = executor
                .run_all_evals(entries, filter, report::log_update)
                .await;
            let report = RunReport::new(&executor.config().repo_root, filter, &results);
            writeln!(out, "{}", report.to_json()?).map_err(HarnessError::Output)?;
            Ok(report.exit_code)
        }
    }
}

pub fn exit_status(outcome: &Result<i32>) -> u8 {
    match outcome {
        Ok(0) => 0,
        Ok(_) => 1,
        Err(_) => HARNESS_FAILURE_EXIT,
    }
}
