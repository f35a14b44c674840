//! Export errors.

use std::path::PathBuf;

/// Errors that can occur while writing puzzle files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A file or directory could not be created or written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A diagram could not be rasterized.
    #[error("failed to render {path}: {reason}")]
    Png {
        /// The PNG file being written.
        path: PathBuf,
        reason: String,
    },

    /// The JSON record could not be serialized.
    #[error("failed to serialize {path}: {source}")]
    Json {
        /// The JSON file being written.
        path: PathBuf,
        /// The underlying serde error.
        source: serde_json::Error,
    },
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ExportError::Io { path, source }
    }
}
