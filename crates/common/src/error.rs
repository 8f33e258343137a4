//! Error types shared across VpdPack crates.

use std::path::PathBuf;

/// Top-level error type for VpdPack operations.
#[derive(Debug, thiserror::Error)]
pub enum VpdError {
    /// The project document is not well-formed JSON. Fatal: nothing on
    /// disk is touched after this.
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Filesystem read/write failure tied to a specific path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is well-formed JSON but not a usable project
    /// (wrong root shape, no `.vpd` file in the container, ...).
    #[error("Document error: {message}")]
    Document { message: String },

    /// A resource's recorded source path does not exist on disk.
    #[error("Source file not found: {path}")]
    MissingSource { path: PathBuf },

    /// Copying a present source file failed.
    #[error("Copy failed for {path}: {message}")]
    Copy { path: PathBuf, message: String },

    /// Final document write or backup copy failed. Fatal: a half-written
    /// document would be worse than no change.
    #[error("Persist error: {message}")]
    Persist { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VpdError.
pub type VpdResult<T> = Result<T, VpdError>;

impl VpdError {
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document {
            message: msg.into(),
        }
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist {
            message: msg.into(),
        }
    }

    pub fn copy(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Copy {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
