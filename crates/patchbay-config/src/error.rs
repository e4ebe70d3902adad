//! Error types for patch document operations.

use std::path::PathBuf;
use thiserror::Error;

use patchbay_core::PatchError;

/// Errors that can occur while loading, saving, or instantiating a patch
/// document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON
    #[error("failed to process patch JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document names a category the registry does not know
    #[error("unknown module category: {0}")]
    UnknownCategory(String),

    /// A graph or resource operation failed during reconstruction
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
