//! Error types for the batch generation dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// Seed and prompt file loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Backend (WebUI endpoint) errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Generation failed with status {status}: {message}")]
    Generation { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl BackendError {
    /// HTTP status code of a failed generation call, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::Generation { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that end a single job. None of these abort the whole dispatch.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Model selection failed: {0}")]
    ModelSelect(#[source] BackendError),

    #[error("Backend setup failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Existing output at {0} was not confirmed")]
    ConfirmationDeclined(PathBuf),
}

impl JobError {
    /// Configuration and input errors make the process exit non-zero
    pub fn is_input_error(&self) -> bool {
        matches!(self, JobError::Config(_) | JobError::Load(_))
    }
}

/// Application-level errors surfaced by the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("{0}")]
    RunFailed(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
