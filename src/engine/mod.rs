//! SessionEngine: the main entry point for session provenance graphs
//!
//! Owns session lifecycle, the provenance graph operations, and read-back.
//! Every operation that mutates a session runs under that session's lock.

mod cascade;
mod error;
mod locks;
mod txn;
mod verify;


pub use cascade::CascadeReport;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use txn::{Derived, SessionTxn};
pub use verify::ConsistencyReport;

use crate::graph::{MetadataIndex, NodeId, NodeKind, NodePayload, SessionId};
use crate::storage::{SessionStore, StorageError};
use locks::{acquire, SessionLocks};
use std::sync::Arc;
use tracing::info;

/// Manages sessions on top of a storage backend
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
}

impl SessionEngine {
    /// Create an engine over the given store
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: SessionLocks::new(),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    // === Session operations ===

    /// Create an empty session and persist its index
    pub fn create_session(&self, name: impl Into<String>) -> EngineResult<SessionId> {
        let id = SessionId::new();
        let index = MetadataIndex::new(name);
        self.store.create_session(&id, &index)?;
        info!(session = %id, name = %index.session_name, "created session");
        Ok(id)
    }

    /// Check if a session exists
    pub fn session_exists(&self, session: &SessionId) -> EngineResult<bool> {
        Ok(self.store.session_exists(session)?)
    }

    /// List all session IDs
    pub fn list_sessions(&self) -> EngineResult<Vec<SessionId>> {
        Ok(self.store.list_sessions()?)
    }

    // === Read-back ===

    /// The session's current index, without payloads
    ///
    /// Saves are atomic, so this does not wait for the session lock.
    pub fn get_metadata(&self, session: &SessionId) -> EngineResult<MetadataIndex> {
        self.load(session)
    }

    /// The payload of one node: its table, or its inline scalar value
    ///
    /// An id absent from the index is `NodeNotFound`. A node present in the
    /// index whose data is gone is `Corrupt`.
    pub fn get_node_payload(&self, session: &SessionId, node: &NodeId) -> EngineResult<NodePayload> {
        let lock = self.locks.handle(session);
        let _guard = acquire(&lock);

        let index = self.load(session)?;
        let entry = index
            .get_node(node)
            .ok_or_else(|| EngineError::NodeNotFound {
                session: session.clone(),
                node: node.clone(),
            })?;

        match entry.kind {
            NodeKind::Data { .. } => {
                txn::read_data_payload(self.store.as_ref(), session, node).map(NodePayload::Table)
            }
            NodeKind::Scalar => index
                .scalar(node)
                .cloned()
                .map(NodePayload::Scalar)
                .ok_or_else(|| {
                    EngineError::corrupt(format!(
                        "scalar node {node} in session {session} has no value"
                    ))
                }),
        }
    }

    /// Load an index, reporting an unknown session as `SessionNotFound`
    fn load(&self, session: &SessionId) -> EngineResult<MetadataIndex> {
        match self.store.load_index(session) {
            Ok(index) => Ok(index),
            Err(StorageError::NotFound(_)) | Err(StorageError::InvalidId(_)) => {
                Err(EngineError::SessionNotFound(session.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
