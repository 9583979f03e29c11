//! Engine errors and their stable classification

use super::cascade::CascadeReport;
use crate::graph::{NodeId, SessionId, TableError};
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in session operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Node not found: {node} in session {session}")]
    NodeNotFound { session: SessionId, node: NodeId },

    #[error("Corrupt session state: {0}")]
    Corrupt(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session busy: {0}")]
    Conflict(SessionId),

    #[error(
        "Cascading delete of {root} committed with {} missing payload(s), {} failed payload(s) and {} dangling edge target(s)",
        .report.missing_payloads.len(),
        .report.failed_payloads.len(),
        .report.dangling_targets.len()
    )]
    CascadeIncomplete { root: NodeId, report: CascadeReport },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    /// Coarse classification for transports
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::SessionNotFound(_) | EngineError::NodeNotFound { .. } => {
                ErrorKind::NotFound
            }
            EngineError::Corrupt(_) | EngineError::CascadeIncomplete { .. } => ErrorKind::Corrupt,
            EngineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::Storage(e) => match e {
                StorageError::NotFound(_) => ErrorKind::NotFound,
                StorageError::Corrupt { .. } => ErrorKind::Corrupt,
                StorageError::InvalidId(_) => ErrorKind::InvalidArgument,
                StorageError::AlreadyExists(_) => ErrorKind::Conflict,
                StorageError::Database(_)
                | StorageError::Serialization(_)
                | StorageError::Io(_) => ErrorKind::Io,
            },
            EngineError::Task(_) => ErrorKind::Io,
        }
    }
}

impl From<TableError> for EngineError {
    fn from(err: TableError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Result type for session operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Stable error classes a transport maps to its own response codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Session, node, or payload absent
    NotFound,
    /// State present but unparsable or referentially broken
    Corrupt,
    /// The request itself is malformed
    InvalidArgument,
    /// Another caller holds the session
    Conflict,
    /// The backend failed underneath
    Io,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Corrupt => "corrupt",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_distinct_codes() {
        let kinds = [
            ErrorKind::NotFound,
            ErrorKind::Corrupt,
            ErrorKind::InvalidArgument,
            ErrorKind::Conflict,
            ErrorKind::Io,
        ];
        let codes: std::collections::HashSet<_> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_code_matches_serde_name() {
        let json = serde_json::to_string(&ErrorKind::InvalidArgument).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorKind::InvalidArgument.code()));
    }

    #[test]
    fn test_storage_errors_classified() {
        let err = EngineError::from(StorageError::NotFound("x".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = EngineError::from(StorageError::InvalidId("../x".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = EngineError::from(StorageError::Io(std::io::Error::other("disk full")));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_cascade_message_counts_dangling_targets() {
        let err = EngineError::CascadeIncomplete {
            root: NodeId::from("a"),
            report: CascadeReport {
                removed: vec![NodeId::from("a")],
                dangling_targets: vec![NodeId::from("ghost")],
                ..Default::default()
            },
        };
        let message = err.to_string();
        assert!(message.contains("1 dangling edge target(s)"), "{message}");
        assert!(message.contains("0 missing payload(s)"), "{message}");
    }

    #[test]
    fn test_table_errors_are_invalid_arguments() {
        let err = EngineError::from(TableError::DuplicateColumn("a".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
