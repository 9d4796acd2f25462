// src/models.rs
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

pub const SKIP_NO_COMMAND: &str = "No test_command provided";

/// One submitted answer, as stored on disk.
#[derive(Deserialize, Debug, Clone)]
pub struct AnswerRecord {
    pub id: String,

    #[serde(default)]
    pub question_id: Option<String>,

    /// Provenance bag; `test_command` is the only key the harness reads.
    #[serde(default)]
    pub receipts: serde_json::Map<String, serde_json::Value>,
}

impl AnswerRecord {
    /// The declared test command, `None` when absent or empty.
    ///
    /// Returns an error message when `test_command` exists but is not a string.
    pub fn test_command(&self) -> std::result::Result<Option<&str>, String> {
        match self.receipts.get("test_command") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(cmd)) if cmd.is_empty() => Ok(None),
            Some(serde_json::Value::String(cmd)) => Ok(Some(cmd.as_str())),
            Some(other) => Err(format!("test_command must be a string, got {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvalResult {
    Pass {
        output_excerpt: String,
    },
    Fail {
        error_excerpt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
    Error {
        error_message: String,
    },
    Skip {
        reason: String,
    },
}

impl EvalResult {
    pub fn skip(reason: impl Into<String>) -> Self {
        EvalResult::Skip {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        EvalResult::Error {
            error_message: message.into(),
        }
    }

    pub fn status(&self) -> EvalStatus {
        match self {
            EvalResult::Pass { .. } => EvalStatus::Pass,
            EvalResult::Fail { .. } => EvalStatus::Fail,
            EvalResult::Error { .. } => EvalStatus::Error,
            EvalResult::Skip { .. } => EvalStatus::Skip,
        }
    }

    /// Text worth showing under the status line, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            EvalResult::Fail { error_excerpt, .. } => Some(error_excerpt.as_str()),
            EvalResult::Error { error_message } => Some(error_message.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvalStatus {
    Pass,
    Fail,
    Error,
    Skip,
}

impl EvalStatus {
    pub fn emoji(self) -> &'static str {
        match self {
            EvalStatus::Pass => "✅",
            EvalStatus::Fail => "❌",
            EvalStatus::Error => "⚠️",
            EvalStatus::Skip => "⏭️",
        }
    }
}

impl fmt::Display for EvalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalStatus::Pass => write!(f, "PASS"),
            EvalStatus::Fail => write!(f, "FAIL"),
            EvalStatus::Error => write!(f, "ERROR"),
            EvalStatus::Skip => write!(f, "SKIP"),
        }
    }
}

/// Results keyed by answer id, in processing order.
///
/// Re-inserting an id replaces its result but keeps its original position.
#[derive(Debug, Default, Clone)]
pub struct ResultTable {
    entries: Vec<(String, EvalResult)>,
    index: HashMap<String, usize>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a result, returning the one it replaced.
    pub fn insert(&mut self, id: impl Into<String>, result: EvalResult) -> Option<EvalResult> {
        let id = id.into();
        match self.index.get(&id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, result)),
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, result));
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&EvalResult> {
        self.index.get(id).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvalResult)> {
        self.entries.iter().map(|(id, result)| (id.as_str(), result))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, result) in &self.entries {
            map.serialize_entry(id, result)?;
        }
        map.end()
    }
}
