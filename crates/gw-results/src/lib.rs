//! gw-results: run-scoped output directory and run manifest.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::{RunFingerprint, digest_bytes, digest_file};
pub use store::OutputDir;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No manifest in {dir}")]
    ManifestNotFound { dir: std::path::PathBuf },

    #[error("Invalid output name '{name}': {message}")]
    InvalidName { name: String, message: String },
}

impl ResultsError {
    pub(crate) fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        ResultsError::Io {
            path: path.into(),
            source,
        }
    }
}
