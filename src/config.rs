// src/config.rs
use crate::errors::{HarnessError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ANSWERS_DIR: &str = "answers";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

/// Harness configuration loaded from environment variables.
///
/// CLI flags are applied on top with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Working directory for every test command.
    pub repo_root: PathBuf,
    /// Answers root, relative to `repo_root` unless absolute.
    pub answers_dir: PathBuf,
    pub timeout: Duration,
    /// How many characters of captured output end up in a result.
    pub excerpt_chars: usize,
}

impl HarnessConfig {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            answers_dir: PathBuf::from(DEFAULT_ANSWERS_DIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let repo_root = match std::env::var("EVALS_REPO_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => std::env::current_dir()?,
        };

        let mut config = Self::new(repo_root);

        if let Ok(dir) = std::env::var("EVALS_ANSWERS_DIR") {
            config.answers_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("EVALS_TIMEOUT_SECS") {
            config = config.with_timeout_secs(parse_number("EVALS_TIMEOUT_SECS", &raw)?)?;
        }
        if let Ok(raw) = std::env::var("EVALS_EXCERPT_CHARS") {
            config.excerpt_chars = parse_number("EVALS_EXCERPT_CHARS", &raw)?;
        }

        Ok(config)
    }

    pub fn with_repo_root(mut self, repo_root: impl Into<PathBuf>) -> Self {
        self.repo_root = repo_root.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(HarnessError::Config(
                "Timeout must be at least one second".to_string(),
            ));
        }
        self.timeout = Duration::from_secs(secs);
        Ok(self)
    }

    /// Resolved answers root.
    pub fn answers_root(&self) -> PathBuf {
        resolve(&self.repo_root, &self.answers_dir)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| HarnessError::Config(format!("{} must be a number, got '{}'", key, raw)))
}
