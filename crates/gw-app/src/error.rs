//! Error types for the gw-app service layer.

use std::path::PathBuf;

use gw_listing::ErrorKind;

/// Application error wrapping the backend crates plus the failures of
/// external commands.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Listing error: {message}")]
    Listing { kind: ErrorKind, message: String },

    #[error("Reach error: {message}")]
    Reach { kind: ErrorKind, message: String },

    #[error("Results error: {0}")]
    Results(String),

    #[error("Executable not found: {program}")]
    ExecutableNotFound { program: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stdout: String,
    },

    #[error("{program} did not finish within {timeout_s} s")]
    Timeout { program: String, timeout_s: f64 },

    #[error("{program} reported '{keyword}' in its output")]
    DiagnosticKeyword {
        program: String,
        keyword: String,
        stdout: String,
    },

    #[error("{program} wrote to stderr: {stderr}")]
    Stderr { program: String, stderr: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gw-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Bad file vs. stale lookup, for errors raised while reading model output.
    pub fn data_kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Listing { kind, .. } | AppError::Reach { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Failures of the external solver or its environment.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            AppError::ExecutableNotFound { .. }
                | AppError::Spawn { .. }
                | AppError::NonZeroExit { .. }
                | AppError::Timeout { .. }
                | AppError::DiagnosticKeyword { .. }
                | AppError::Stderr { .. }
        )
    }
}

impl From<gw_listing::ListingError> for AppError {
    fn from(err: gw_listing::ListingError) -> Self {
        AppError::Listing {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<gw_reach::ReachError> for AppError {
    fn from(err: gw_reach::ReachError) -> Self {
        AppError::Reach {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<gw_results::ResultsError> for AppError {
    fn from(err: gw_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
