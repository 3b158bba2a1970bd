//! Error taxonomy for the sync planning engine.
//!
//! Errors are categorized so the orchestrator knows how to react:
//! - `Configuration`/`Dispatcher`/`Enumeration` are fatal and cancel the sync.
//! - `Item` is recoverable: the offending object is skipped and the sync continues.
//! - `Cancelled` is not really an error, but it still needs an exit path.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by the orchestrator.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or incompatible arguments: unknown location kind, type mismatch
    /// between source/destination, missing destination when one is required.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Unrecoverable failure while listing either side (auth, network, 404 on
    /// the root). Fatal to the sync.
    #[error("enumeration error on {side}: {source}")]
    Enumeration {
        side: Side,
        #[source]
        source: EnumerationError,
    },

    /// The dispatcher rejected a part. Fatal; cancels outstanding traversals.
    #[error("dispatcher error: {0}")]
    Dispatcher(#[from] DispatcherError),

    /// A fatal error or a user-signaled abort closed the shared cancellation
    /// token before the sync could finish.
    #[error("sync cancelled")]
    Cancelled,
}

/// Which side of the sync an error occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Side::Source => "source",
            Side::Destination => "destination",
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "unable to classify endpoint {endpoint:?}: not a local path and host does not match a known remote service suffix"
    )]
    UnknownLocation { endpoint: String },

    #[error(
        "source is a collection but destination {destination:?} does not exist; create it first"
    )]
    DestinationMissing { destination: String },

    #[error(
        "source is a collection ({source_kind:?}) but destination ({destination:?}) is a single object"
    )]
    TypeMismatch { source_kind: String, destination: String },

    #[error("invalid filter pattern {pattern:?}: {message}")]
    InvalidFilter { pattern: String, message: String },
}

/// Unrecoverable failure while listing one side of the sync.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("I/O error enumerating {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote listing failed for prefix {prefix:?}: {message}")]
    Remote { prefix: String, message: String },
}

/// Per-object failure. Logged as a warning; the object is skipped and the
/// sync continues.
#[derive(Debug, Error)]
#[error("item error on {path}: {message}")]
pub struct ItemError {
    pub path: PathBuf,
    pub message: String,
}

impl ItemError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The transfer subsystem rejected a `JobPartOrder`.
#[derive(Debug, Error)]
#[error("dispatcher rejected part {part_number}: {message}")]
pub struct DispatcherError {
    pub part_number: u64,
    pub message: String,
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_wraps_into_sync_error() {
        let err: SyncError = ConfigurationError::DestinationMissing {
            destination: "https://acct.blob.core.windows.net/c/dir".into(),
        }
        .into();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn item_error_carries_path_and_message() {
        let err = ItemError::new("a/b.txt", "metadata unreadable");
        assert_eq!(err.path, PathBuf::from("a/b.txt"));
        assert!(err.to_string().contains("metadata unreadable"));
    }
}
