//! Symbol index error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or refreshing the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File parsing error.
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// No parser registered for the file's extension.
    #[error("No declaration parser for {}", .0.display())]
    Unsupported(PathBuf),

    /// Directory walk error.
    #[error("Walk error: {0}")]
    Walk(String),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ignore::Error> for IndexError {
    fn from(err: ignore::Error) -> Self {
        IndexError::Walk(err.to_string())
    }
}
