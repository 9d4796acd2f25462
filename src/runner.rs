// src/runner.rs
use crate::config::HarnessConfig;
use crate::models::{AnswerRecord, EvalResult, ResultTable, SKIP_NO_COMMAND};
use crate::source::SourceEntry;
use std::future::Future;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// What happened to a command that was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The process ended on its own. A signal death on Unix is reported as `-signal`.
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The process outlived its time budget and was killed.
    TimedOut,
}

/// Runs a test command string.
///
/// `Err` means the command could not be run at all (spawn or wait failure).
///
/// Note: implementers handle async directly instead of going through async_trait.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> impl Future<Output = std::io::Result<CommandOutcome>> + Send;
}

/// Hands the command to the system shell, like a user typing it at a prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> std::io::Result<CommandOutcome> {
        let mut cmd = shell_command(command);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        log::debug!("Spawned pid {:?} for {:?}", child.id(), command);

        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));
        let stdout_abort = stdout_task.abort_handle();
        let stderr_abort = stderr_task.abort_handle();

        // Output collection is inside the budget: a background grandchild can
        // keep the pipes open after the shell itself has exited.
        let collected = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await;

        match collected {
            Ok(Ok((status, stdout, stderr))) => Ok(CommandOutcome::Exited {
                code: exit_code(status),
                stdout,
                stderr,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                stdout_abort.abort();
                stderr_abort.abort();
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill timed out command {:?}: {}", command, e);
                }
                Ok(CommandOutcome::TimedOut)
            }
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.code().or_else(|| status.signal().map(|signal| -signal))
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> Option<i32> {
    status.code()
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            log::debug!("Stopped reading command output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn timeout_message(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        format!("Test timed out (>{}s)", timeout.as_secs())
    } else {
        format!("Test timed out (>{}ms)", timeout.as_millis())
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, Copy)]
pub enum EvalUpdate<'a> {
    Started {
        id: &'a str,
        question_id: Option<&'a str>,
    },
    Running {
        command: &'a str,
    },
    Finished {
        id: &'a str,
        result: &'a EvalResult,
    },
}

/// Runs answer test commands one at a time and classifies the outcomes.
pub struct EvalExecutor<R = ShellRunner> {
    config: HarnessConfig,
    runner: R,
}

impl EvalExecutor<ShellRunner> {
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_runner(config, ShellRunner)
    }
}

impl<R: CommandRunner> EvalExecutor<R> {
    pub fn with_runner(config: HarnessConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run the eval for a single answer.
    pub async fn run_eval(&self, record: &AnswerRecord) -> EvalResult {
        let command = match record.test_command() {
            Ok(Some(command)) => command,
            Ok(None) => return EvalResult::skip(SKIP_NO_COMMAND),
            Err(message) => return EvalResult::error(message),
        };

        let started = Instant::now();
        let outcome = self
            .runner
            .run(command, &self.config.repo_root, self.config.timeout)
            .await;
        log::debug!(
            "Answer {} finished in {}ms",
            record.id,
            started.elapsed().as_millis()
        );

        self.classify(outcome)
    }

    fn classify(&self, outcome: std::io::Result<CommandOutcome>) -> EvalResult {
        let max = self.config.excerpt_chars;
        match outcome {
            Ok(CommandOutcome::Exited {
                code: Some(0),
                stdout,
                ..
            }) => EvalResult::Pass {
                output_excerpt: excerpt(&stdout, max),
            },
            Ok(CommandOutcome::Exited { code, stderr, .. }) => EvalResult::Fail {
                error_excerpt: excerpt(&stderr, max),
                exit_code: code,
            },
            Ok(CommandOutcome::TimedOut) => EvalResult::Fail {
                error_excerpt: timeout_message(self.config.timeout),
                exit_code: None,
            },
            Err(e) => EvalResult::error(e.to_string()),
        }
    }

    /// Run evals for every entry, or only those whose id equals `filter_id`.
    ///
    /// An empty `filter_id` selects everything.
    pub async fn run_all_evals<I, F>(
        &self,
        entries: I,
        filter_id: Option<&str>,
        mut on_update: F,
    ) -> ResultTable
    where
        I: IntoIterator<Item = SourceEntry>,
        F: FnMut(EvalUpdate<'_>),
    {
        let filter_id = filter_id.filter(|id| !id.is_empty());
        let mut results = ResultTable::new();

        for entry in entries {
            let record = match entry.record {
                Ok(record) => record,
                Err(e) => {
                    if filter_id.is_some() {
                        log::warn!("Ignoring unreadable answer {:?} while filtering", entry.path);
                        continue;
                    }
                    let result = EvalResult::error(e.to_string());
                    on_update(EvalUpdate::Started {
                        id: &entry.key,
                        question_id: None,
                    });
                    on_update(EvalUpdate::Finished {
                        id: &entry.key,
                        result: &result,
                    });
                    results.insert(entry.key, result);
                    continue;
                }
            };

            if filter_id.is_some_and(|wanted| wanted != record.id) {
                continue;
            }

            on_update(EvalUpdate::Started {
                id: &record.id,
                question_id: record.question_id.as_deref(),
            });
            if let Ok(Some(command)) = record.test_command() {
                on_update(EvalUpdate::Running { command });
            }

            let result = self.run_eval(&record).await;
            on_update(EvalUpdate::Finished {
                id: &record.id,
                result: &result,
            });

            if results.insert(record.id.clone(), result).is_some() {
                log::warn!("Duplicate answer id {}; keeping the latest result", record.id);
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned outcomes and remembers every command it was asked to run.
    #[derive(Default)]
    struct FakeRunner {
        calls: Mutex<Vec<String>>,
        outcome: Option<CommandOutcome>,
    }

    impl FakeRunner {
        fn returning(outcome: CommandOutcome) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outcome: Some(outcome),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            command: &str,
            _cwd: &Path,
            _timeout: Duration,
        ) -> std::io::Result<CommandOutcome> {
            self.calls.lock().unwrap().push(command.to_string());
            self.outcome.clone().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such shell")
            })
        }
    }

    fn record(value: serde_json::Value) -> AnswerRecord {
        serde_json::from_value(value).unwrap()
    }

    fn executor(runner: FakeRunner) -> EvalExecutor<FakeRunner> {
        EvalExecutor::with_runner(HarnessConfig::new("."), runner)
    }

    fn entry(value: serde_json::Value) -> SourceEntry {
        let record = record(value);
        SourceEntry {
            path: format!("{}.json", record.id).into(),
            key: format!("{}.json", record.id),
            record: Ok(record),
        }
    }

    #[tokio::test]
    async fn test_skip_spawns_nothing() {
        let exec = executor(FakeRunner::default());
        let result = exec.run_eval(&record(json!({"id": "a", "receipts": {}}))).await;

        assert_eq!(result, EvalResult::skip("No test_command provided"));
        assert_eq!(exec.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_pass_truncates_stdout() {
        let exec = executor(FakeRunner::returning(CommandOutcome::Exited {
            code: Some(0),
            stdout: "é".repeat(250),
            stderr: String::new(),
        }));
        let result = exec
            .run_eval(&record(json!({"id": "a", "receipts": {"test_command": "true"}})))
            .await;

        assert_eq!(
            result,
            EvalResult::Pass {
                output_excerpt: "é".repeat(200)
            }
        );
        assert_eq!(exec.runner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_keeps_exit_code_and_stderr() {
        let exec = executor(FakeRunner::returning(CommandOutcome::Exited {
            code: Some(7),
            stdout: "ignored".to_string(),
            stderr: "broken".to_string(),
        }));
        let result = exec
            .run_eval(&record(json!({"id": "a", "receipts": {"test_command": "x"}})))
            .await;

        assert_eq!(
            result,
            EvalResult::Fail {
                error_excerpt: "broken".to_string(),
                exit_code: Some(7)
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let exec = executor(FakeRunner::returning(CommandOutcome::TimedOut));
        let result = exec
            .run_eval(&record(json!({"id": "a", "receipts": {"test_command": "x"}})))
            .await;

        assert_eq!(
            result,
            EvalResult::Fail {
                error_excerpt: "Test timed out (>30s)".to_string(),
                exit_code: None
            }
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let exec = executor(FakeRunner::default());
        let result = exec
            .run_eval(&record(json!({"id": "a", "receipts": {"test_command": "x"}})))
            .await;

        assert_eq!(result, EvalResult::error("no such shell"));
    }

    #[tokio::test]
    async fn test_non_string_command_is_an_error_without_spawn() {
        let exec = executor(FakeRunner::default());
        let result = exec
            .run_eval(&record(json!({"id": "a", "receipts": {"test_command": 5}})))
            .await;

        assert!(matches!(result, EvalResult::Error { .. }));
        assert_eq!(exec.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_filter_limits_run_to_matching_id() {
        let exec = executor(FakeRunner::returning(CommandOutcome::Exited {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }));
        let entries = vec![
            entry(json!({"id": "a", "receipts": {"test_command": "one"}})),
            entry(json!({"id": "b", "receipts": {"test_command": "two"}})),
        ];

        let table = exec.run_all_evals(entries, Some("b"), |_| {}).await;

        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(*exec.runner().calls.lock().unwrap(), vec!["two".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_filter_runs_everything() {
        let exec = executor(FakeRunner::returning(CommandOutcome::Exited {
            code: Some(3),
            stdout: String::new(),
            stderr: String::new(),
        }));
        let entries = vec![
            entry(json!({"id": "a", "receipts": {"test_command": "exit 3"}})),
            entry(json!({"id": "b", "receipts": {}})),
        ];

        let table = exec.run_all_evals(entries, Some(""), |_| {}).await;

        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            table.get("a"),
            Some(&EvalResult::Fail {
                error_excerpt: String::new(),
                exit_code: Some(3)
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_filter_yields_empty_table() {
        let exec = executor(FakeRunner::default());
        let entries = vec![entry(json!({"id": "a", "receipts": {}}))];

        let table = exec.run_all_evals(entries, Some("zzz"), |_| {}).await;

        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entry_recorded_as_error() {
        let exec = executor(FakeRunner::default());
        let entries = vec![SourceEntry {
            path: "answers/bad.json".into(),
            key: "bad.json".to_string(),
            record: Err(crate::errors::HarnessError::Config("unreadable".to_string())),
        }];

        let table = exec.run_all_evals(entries, None, |_| {}).await;

        assert!(matches!(table.get("bad.json"), Some(EvalResult::Error { .. })));
    }

    #[tokio::test]
    async fn test_invalid_entry_ignored_while_filtering() {
        let exec = executor(FakeRunner::default());
        let entries = vec![SourceEntry {
            path: "answers/bad.json".into(),
            key: "bad.json".to_string(),
            record: Err(crate::errors::HarnessError::Config("unreadable".to_string())),
        }];

        let table = exec.run_all_evals(entries, Some("a"), |_| {}).await;

        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_updates_follow_processing_order() {
        let exec = executor(FakeRunner::returning(CommandOutcome::Exited {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }));
        let entries = vec![
            entry(json!({"id": "a", "question_id": "q1", "receipts": {"test_command": "ok"}})),
            entry(json!({"id": "b", "question_id": "q2"})),
        ];

        let mut seen = Vec::new();
        exec.run_all_evals(entries, None, |update| {
            seen.push(match update {
                EvalUpdate::Started { id, question_id } => {
                    format!("start {} {}", id, question_id.unwrap_or("-"))
                }
                EvalUpdate::Running { command } => format!("run {}", command),
                EvalUpdate::Finished { id, result } => format!("done {} {}", id, result.status()),
            })
        })
        .await;

        assert_eq!(
            seen,
            vec![
                "start a q1",
                "run ok",
                "done a PASS",
                "start b q2",
                "done b SKIP"
            ]
        );
    }

    #[test]
    fn test_timeout_message_formats() {
        assert_eq!(timeout_message(Duration::from_secs(30)), "Test timed out (>30s)");
        assert_eq!(timeout_message(Duration::from_millis(1500)), "Test timed out (>1500ms)");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_runner_captures_both_streams() {
        let outcome = ShellRunner
            .run("echo out; echo err >&2; exit 3", Path::new("."), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Exited {
                code: Some(3),
                stdout: "out\n".to_string(),
                stderr: "err\n".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_runner_kills_on_timeout() {
        let started = Instant::now();
        let outcome = ShellRunner
            .run("sleep 5", Path::new("."), Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_runner_reports_signal_as_negative_code() {
        let outcome = ShellRunner
            .run("kill -9 $$", Path::new("."), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Exited {
                code: Some(-9),
                stdout: String::new(),
                stderr: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_shell_runner_missing_cwd_is_spawn_error() {
        let result = ShellRunner
            .run("true", Path::new("/definitely/not/here"), Duration::from_secs(5))
            .await;

        assert!(result.is_err());
    }
}
