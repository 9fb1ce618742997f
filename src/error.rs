//! Error taxonomy shared by the store, the service and the tool layer.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced by the notes core.
///
/// A missing note is not an error: lookups and updates report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum NotesError {
    /// Input rejected against the operation contracts. Nothing was written.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The index file could not be parsed or failed validation.
    #[error("Invalid index file {}: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// Filesystem failure while reading or writing an artifact.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON encoding failure.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl NotesError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result alias used throughout the library.
pub type Result<T, E = NotesError> = std::result::Result<T, E>;
