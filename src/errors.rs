// src/errors.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to walk answers directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid answer record {}: {reason}", path.display())]
    InvalidRecord { path: PathBuf, reason: String },

    #[error("Failed to write report: {0}")]
    Output(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
