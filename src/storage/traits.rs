//! Storage trait definitions

use crate::graph::{MetadataIndex, NodeId, SessionId, Table};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("corrupt {what}: {reason}")]
    Corrupt { what: String, reason: String },

    #[error("invalid id {0:?}: must be a single path segment")]
    InvalidId(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn corrupt(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Table payloads of Data nodes, keyed by `(session, node)`
///
/// Payloads are written once under a fresh id and later deleted; an
/// overwrite with the same content must succeed so writes can be retried.
pub trait PayloadStore: Send + Sync {
    /// Write a table payload, replacing any previous one for the same id
    fn put_table(&self, session: &SessionId, node: &NodeId, table: &Table) -> StorageResult<()>;

    /// Read a table payload; `NotFound` if absent, `Corrupt` if unreadable
    fn get_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<Table>;

    /// Remove a table payload; `NotFound` if absent
    fn delete_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<()>;

    /// Check whether a payload exists
    fn has_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<bool>;

    /// Ids of all payloads stored for a session
    fn list_tables(&self, session: &SessionId) -> StorageResult<Vec<NodeId>>;
}

/// Persisted metadata indexes, one per session
pub trait MetadataStore: Send + Sync {
    /// Persist the initial index of a new session; `AlreadyExists` if taken
    fn create_session(&self, session: &SessionId, index: &MetadataIndex) -> StorageResult<()>;

    /// Load a session's index; `NotFound` if the session does not exist,
    /// `Corrupt` if it cannot be parsed
    fn load_index(&self, session: &SessionId) -> StorageResult<MetadataIndex>;

    /// Replace a session's index as one unit
    ///
    /// Readers observe either the previous or the new index, never a mix.
    /// Fails with `NotFound` rather than creating a session implicitly.
    fn save_index(&self, session: &SessionId, index: &MetadataIndex) -> StorageResult<()>;

    /// Check whether a session exists
    fn session_exists(&self, session: &SessionId) -> StorageResult<bool>;

    /// List all session IDs
    fn list_sessions(&self) -> StorageResult<Vec<SessionId>>;
}

/// A backend holding both halves of a session's state
pub trait SessionStore: MetadataStore + PayloadStore {}

impl<T: MetadataStore + PayloadStore> SessionStore for T {}

/// Extension trait for opening stores from paths
pub trait OpenStore: SessionStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;
}
