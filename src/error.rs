use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelhub operations.
///
/// Only dataset-level and registry-level failures surface here. Per-line and
/// per-file problems are collected into reports instead of being returned.
#[derive(Debug, Error)]
pub enum LabelhubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset path does not exist or is not a directory: {path}")]
    DatasetRootMissing { path: PathBuf },

    #[error("Labels directory not found under {path}")]
    LabelsDirMissing { path: PathBuf },

    #[error("Could not determine dataset format for {path}: {reason}")]
    FormatUnknown { path: PathBuf, reason: String },

    #[error("Instance not found: {name}")]
    InstanceNotFound { name: String },

    #[error("Failed to parse instance registry {path}: {source}")]
    RegistryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write instance registry {path}: {message}")]
    RegistryWrite { path: PathBuf, message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),

    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Conversion incomplete: {failed} file(s) failed")]
    ConversionIncomplete { failed: usize },
}
