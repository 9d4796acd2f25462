// src/summary.rs
use crate::models::{EvalStatus, ResultTable};
use serde::Serialize;

/// Per-status counts over a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_table(table: &ResultTable) -> Self {
        let mut summary = Summary::default();
        for (_, result) in table.iter() {
            summary.total += 1;
            match result.status() {
                EvalStatus::Pass => summary.passed += 1,
                EvalStatus::Fail => summary.failed += 1,
                EvalStatus::Error => summary.errors += 1,
                EvalStatus::Skip => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed + self.errors > 0
    }

    /// `1` when anything failed or errored, otherwise `0`.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() { 1 } else { 0 }
    }
}

pub fn summarize(table: &ResultTable) -> (Summary, i32) {
    let summary = Summary::from_table(table);
    let code = summary.exit_code();
    (summary, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvalResult;

    fn pass() -> EvalResult {
        EvalResult::Pass {
            output_excerpt: "ok".to_string(),
        }
    }

    #[test]
    fn test_one_of_each() {
        let mut table = ResultTable::new();
        table.insert("p", pass());
        table.insert(
            "f",
            EvalResult::Fail {
                error_excerpt: "no".to_string(),
                exit_code: Some(1),
            },
        );
        table.insert("e", EvalResult::error("spawn failed"));
        table.insert("s", EvalResult::skip("No test_command provided"));

        let (summary, code) = summarize(&table);

        assert_eq!(
            summary,
            Summary {
                total: 4,
                passed: 1,
                failed: 1,
                errors: 1,
                skipped: 1
            }
        );
        assert_eq!(code, 1);
    }

    #[test]
    fn test_pass_and_skip_only_exit_zero() {
        let mut table = ResultTable::new();
        table.insert("p", pass());
        table.insert("s", EvalResult::skip("No test_command provided"));

        assert_eq!(summarize(&table).1, 0);
    }

    #[test]
    fn test_error_alone_fails_the_run() {
        let mut table = ResultTable::new();
        table.insert("e", EvalResult::error("bad"));

        assert_eq!(summarize(&table).1, 1);
    }

    #[test]
    fn test_empty_table() {
        let (summary, code) = summarize(&ResultTable::new());
        assert_eq!(summary, Summary::default());
        assert_eq!(code, 0);
    }
}
