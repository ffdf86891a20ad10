//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Archive entry would be written outside the working directory
    #[error("Unsafe archive entry path: {entry}")]
    PathTraversal {
        /// Entry name as stored in the archive
        entry: String,
    },

    /// API answered with a non-success status
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport failure description
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// What was wrong with the body
        message: String,
    },

    /// Document never reached the `done` status
    #[error("Translation timed out after {attempts} status checks")]
    TimeoutError {
        /// Number of poll attempts made
        attempts: u32,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        /// Path involved in the failure
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// Background task failures and broken internal invariants
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Zip container error
    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TranslationError {
    /// Build a [`TranslationError::FileError`] for `path`
    pub fn file(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        TranslationError::FileError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the error is a poll budget exhaustion
    pub fn is_timeout(&self) -> bool {
        matches!(self, TranslationError::TimeoutError { .. })
    }

    /// Errors that make the archive itself unusable and abort the whole run.
    ///
    /// Everything else is scoped to the single document being translated.
    pub fn is_archive_fatal(&self) -> bool {
        matches!(
            self,
            TranslationError::PathTraversal { .. }
                | TranslationError::ArchiveError(_)
                | TranslationError::ConfigError { .. }
        )
    }
}

impl From<tokio::task::JoinError> for TranslationError {
    fn from(err: tokio::task::JoinError) -> Self {
        TranslationError::InternalError(format!("background task failed: {err}"))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(err: config::ConfigError) -> Self {
        TranslationError::ConfigError {
            message: err.to_string(),
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
