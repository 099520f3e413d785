//! Error types for the message store.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured journal could not be opened for append. The store
    /// refuses to start without durability.
    #[error("Cannot open journal {path}: {source}")]
    JournalOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Journal {path} is locked by another store")]
    Locked { path: PathBuf },

    #[error("room name cannot be blank")]
    InvalidRoomName,

    #[error("room already exists: {0}")]
    RoomAlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cannot load user directory {path}: {source}")]
    UserDirectory {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub(crate) fn journal_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::JournalOpen {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the store could not be constructed at all.
    pub fn is_fatal_init(&self) -> bool {
        matches!(
            self,
            StoreError::JournalOpen { .. } | StoreError::Locked { .. }
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Login failure.
///
/// Unknown users and wrong passwords collapse into one variant so callers
/// cannot tell which usernames exist.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
