//! Error types for reconciliation runs.
//!
//! Every failure is fatal for the run and carries the path of the file or
//! remote resource it originated from.

use crate::canonical::CanonicalError;
use std::io;
use std::path::PathBuf;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a reconciliation run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the declared tree failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A declared file is not a valid document of its kind.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Declared configuration cannot be compared with the live state.
    #[error("configuration mismatch in {}: {source}", path.display())]
    ConfigMismatch {
        path: PathBuf,
        #[source]
        source: CanonicalError,
    },

    /// A call to the remote service failed.
    #[error("remote call for {resource} failed: {source}")]
    Remote {
        resource: String,
        #[source]
        source: vaultkit::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn remote(resource: impl Into<String>, source: vaultkit::Error) -> Self {
        Self::Remote {
            resource: resource.into(),
            source,
        }
    }

    /// Classification of the underlying remote failure, if any.
    #[must_use]
    pub fn remote_category(&self) -> Option<vaultkit::ErrorCategory> {
        match self {
            Self::Remote { source, .. } => Some(source.category()),
            _ => None,
        }
    }
}
