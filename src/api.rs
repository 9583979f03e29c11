//! Async entry point for transports.
//!
//! `SessionApi` wraps a shared `SessionEngine` and runs each call on
//! tokio's blocking pool, so storage I/O and session-lock waits never stall
//! the async executor. Transports (HTTP, RPC, embedding) call these methods
//! and map `EngineError::kind()` onto their own status codes.
//!
//! `SessionReader` is the read-only half, for consumers that render a
//! session but must not change it.

use std::sync::Arc;

use crate::engine::{
    CascadeReport, ConsistencyReport, Derived, EngineResult, SessionEngine,
};
use crate::graph::{MetadataIndex, NodeId, NodePayload, SessionId, Table};

/// Run a blocking engine call off the async executor
async fn blocking<T, F>(engine: &Arc<SessionEngine>, f: F) -> EngineResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SessionEngine) -> EngineResult<T> + Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || f(&engine)).await?
}

/// Async facade over the session engine.
#[derive(Clone)]
pub struct SessionApi {
    engine: Arc<SessionEngine>,
}

impl SessionApi {
    pub fn new(engine: Arc<SessionEngine>) -> Self {
        Self { engine }
    }

    /// The wrapped engine, for synchronous callers
    pub fn engine(&self) -> &Arc<SessionEngine> {
        &self.engine
    }

    /// A handle that can only read
    pub fn reader(&self) -> SessionReader {
        SessionReader {
            engine: Arc::clone(&self.engine),
        }
    }

    // --- Sessions ---

    pub async fn create_session(&self, name: impl Into<String>) -> EngineResult<SessionId> {
        let name = name.into();
        blocking(&self.engine, move |e| e.create_session(name)).await
    }

    pub async fn session_exists(&self, session: &SessionId) -> EngineResult<bool> {
        let session = session.clone();
        blocking(&self.engine, move |e| e.session_exists(&session)).await
    }

    pub async fn list_sessions(&self) -> EngineResult<Vec<SessionId>> {
        blocking(&self.engine, |e| e.list_sessions()).await
    }

    // --- Write ---

    /// Register an uploaded table as a root node.
    pub async fn upload_table(
        &self,
        session: &SessionId,
        table: Table,
        name: impl Into<String>,
    ) -> EngineResult<NodeId> {
        let session = session.clone();
        let name = name.into();
        blocking(&self.engine, move |e| e.upload_table(&session, &table, name)).await
    }

    /// Derive a node from `source`. `compute` runs on the blocking pool while
    /// the session lock is held.
    pub async fn derive<F>(
        &self,
        session: &SessionId,
        source: &NodeId,
        operation: impl Into<String>,
        compute: F,
    ) -> EngineResult<NodeId>
    where
        F: FnOnce(&Table) -> EngineResult<Derived> + Send + 'static,
    {
        let session = session.clone();
        let source = source.clone();
        let operation = operation.into();
        blocking(&self.engine, move |e| {
            e.derive(&session, &source, &operation, compute)
        })
        .await
    }

    /// Delete a node and everything derived from it.
    pub async fn delete_node(&self, session: &SessionId, node: &NodeId) -> EngineResult<CascadeReport> {
        let session = session.clone();
        let node = node.clone();
        blocking(&self.engine, move |e| e.delete_node(&session, &node)).await
    }

    // --- Read ---

    pub async fn get_metadata(&self, session: &SessionId) -> EngineResult<MetadataIndex> {
        self.reader().get_metadata(session).await
    }

    pub async fn get_node_payload(&self, session: &SessionId, node: &NodeId) -> EngineResult<NodePayload> {
        self.reader().get_node_payload(session, node).await
    }

    /// Report index/payload inconsistencies without repairing them.
    pub async fn verify(&self, session: &SessionId) -> EngineResult<ConsistencyReport> {
        let session = session.clone();
        blocking(&self.engine, move |e| e.verify(&session)).await
    }
}

/// Read-only view of the engine.
#[derive(Clone)]
pub struct SessionReader {
    engine: Arc<SessionEngine>,
}

impl SessionReader {
    pub async fn list_sessions(&self) -> EngineResult<Vec<SessionId>> {
        blocking(&self.engine, |e| e.list_sessions()).await
    }

    pub async fn get_metadata(&self, session: &SessionId) -> EngineResult<MetadataIndex> {
        let session = session.clone();
        blocking(&self.engine, move |e| e.get_metadata(&session)).await
    }

    pub async fn get_node_payload(&self, session: &SessionId, node: &NodeId) -> EngineResult<NodePayload> {
        let session = session.clone();
        let node = node.clone();
        blocking(&self.engine, move |e| e.get_node_payload(&session, &node)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, ErrorKind};
    use crate::graph::Value;
    use crate::storage::SqliteStore;

    fn setup() -> SessionApi {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        SessionApi::new(Arc::new(SessionEngine::new(store)))
    }

    fn scores() -> Table {
        Table::new(
            vec!["score".into()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(6)]],
        )
        .unwrap()
    }

    // === Scenario: upload then derive through the async facade ===
    #[tokio::test]
    async fn derive_runs_compute_on_blocking_pool() {
        let api = setup();
        let s = api.create_session("async").await.unwrap();
        let n1 = api.upload_table(&s, scores(), "scores").await.unwrap();

        let n2 = api
            .derive(&s, &n1, "max(score)", |t| {
                let max = t
                    .column("score")
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_f64)
                    .fold(f64::MIN, f64::max);
                Ok(Derived::Scalar(Value::Float(max)))
            })
            .await
            .unwrap();

        let payload = api.get_node_payload(&s, &n2).await.unwrap();
        assert_eq!(payload.as_scalar(), Some(&Value::Float(6.0)));
        let index = api.get_metadata(&s).await.unwrap();
        assert_eq!(index.edge_count(), 1);
    }

    // === Scenario: errors keep their class across the blocking boundary ===
    #[tokio::test]
    async fn errors_cross_task_boundary_intact() {
        let api = setup();
        let s = api.create_session("async").await.unwrap();

        let err = api.delete_node(&s, &NodeId::from("nope")).await.unwrap_err();
        assert!(matches!(err, EngineError::NodeNotFound { .. }));

        let err = api.get_metadata(&SessionId::from("nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // === Scenario: reader sees writes made through the api ===
    #[tokio::test]
    async fn reader_shares_engine() {
        let api = setup();
        let reader = api.reader();
        let s = api.create_session("shared").await.unwrap();
        api.upload_table(&s, scores(), "scores").await.unwrap();

        assert_eq!(reader.list_sessions().await.unwrap(), vec![s.clone()]);
        assert_eq!(reader.get_metadata(&s).await.unwrap().node_count(), 1);
        assert!(api.verify(&s).await.unwrap().is_consistent());
    }
}
