// src/source.rs
//! Discovery and loading of answer records from the answers directory.

use crate::errors::{HarnessError, Result};
use crate::models::AnswerRecord;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One discovered answer file.
///
/// `record` holds the load error when the file could not be turned into an
/// `AnswerRecord`; the run records it instead of aborting.
#[derive(Debug)]
pub struct SourceEntry {
    pub path: PathBuf,
    /// Path relative to the answers root, used to key unloadable files.
    pub key: String,
    pub record: Result<AnswerRecord>,
}

/// Supplies answer records found recursively under a root directory.
pub struct AnswerSource {
    root: PathBuf,
}

impl AnswerSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// All `*.json` files under the root, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            log::warn!("Answers directory {:?} does not exist", self.root);
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && is_answer_file(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        log::debug!("Discovered {} answer files under {:?}", paths.len(), self.root);
        Ok(paths)
    }

    /// Loads every discovered file. Only a failing directory walk is an error.
    pub fn entries(&self) -> Result<Vec<SourceEntry>> {
        let entries = self
            .discover()?
            .into_iter()
            .map(|path| {
                let record = load_answer(&path);
                if let Err(e) = &record {
                    log::warn!("{}", e);
                }
                SourceEntry {
                    key: self.key_for(&path),
                    path,
                    record,
                }
            })
            .collect();
        Ok(entries)
    }

    fn key_for(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

/// Load a single answer record from a JSON file.
pub fn load_answer(path: &Path) -> Result<AnswerRecord> {
    let content = std::fs::read_to_string(path).map_err(|e| HarnessError::InvalidRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| HarnessError::InvalidRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn is_answer_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
