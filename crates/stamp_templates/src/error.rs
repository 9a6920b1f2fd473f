//! Error types for template operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while resolving, fetching or rendering templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Local template path does not exist or is not a directory: {0}")]
    LocalPathInvalid(PathBuf),

    #[error("Unsupported URL protocol for '{url}': only http and https are accepted")]
    UnsupportedProtocol { url: String },

    #[error("Download failed for '{url}': {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Failed to clone repository '{location}': {message}")]
    CloneFailed { location: String, message: String },

    #[error("Archive extraction failed for '{url}': {message}")]
    ExtractionFailed { url: String, message: String },

    #[error("Built-in template directory not found: {0}")]
    BuiltinMissing(PathBuf),

    #[error("Subdirectory '{subdir}' not found in template '{location}'")]
    SubdirMissing { location: String, subdir: String },

    #[error("Template validation failed: {0}")]
    ValidationFailed(String),

    #[error("Rendering failed for {path}: {message}")]
    RenderingFailed { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Copy error: {0}")]
    Copy(#[from] fs_extra::error::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
