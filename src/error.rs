//! Error type shared by every tagfold operation.
//!
//! Errors local to one entry or one directory are recorded and reported by the
//! walker and the operations built on it; only setup-level errors (missing
//! root, unreadable configuration, staging directory creation) are returned
//! as a fatal `Err` from an operation.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Result type for tagfold operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Setup
    #[error("root directory {} does not exist or is not a directory", .0.display())]
    MissingRoot(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Traversal
    #[error("could not list {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to process {}: {source}", path.display())]
    Visitor {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    // Mutation
    #[error(
        "no free name for {} (tried {} and 99 numbered variants)",
        original.display(),
        target.display()
    )]
    CollisionExhausted { original: PathBuf, target: PathBuf },

    #[error("{operation} requires the confirmation token '{token}'")]
    ConfirmationRequired {
        operation: &'static str,
        token: &'static str,
    },

    #[error("could not remove emptied directory {}: {source}", path.display())]
    StructuralCleanupPartialFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tag folder {} does not exist", .0.display())]
    TagFolderMissing(PathBuf),

    #[error("invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // History
    #[error("history error: {reason}")]
    History { reason: String },
}

impl Error {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attributes a failure to the entry being visited when it happened.
    pub fn visiting(path: &Path, source: Error) -> Self {
        Self::Visitor {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MissingRoot(p) | Self::TagFolderMissing(p) => Some(p.as_path()),
            Self::Listing { path, .. }
            | Self::Visitor { path, .. }
            | Self::StructuralCleanupPartialFailure { path, .. }
            | Self::Io { path, .. } => Some(path.as_path()),
            Self::CollisionExhausted { original, .. } => Some(original.as_path()),
            _ => None,
        }
    }

    /// The underlying error, looking through any per-entry [`Error::Visitor`] wrapping.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Visitor { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether a broader operation can continue after this error.
    ///
    /// Fatal errors stop the whole operation before it mutates anything.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::MissingRoot(_) | Self::Config(_) | Self::ConfirmationRequired { .. }
        )
    }
}
