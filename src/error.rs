//! Error types for planning and applying folder layouts.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoldersError {
    #[error("Directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias using FoldersError
pub type Result<T> = std::result::Result<T, FoldersError>;
