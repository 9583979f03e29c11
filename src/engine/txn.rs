//! Session transactions: load, mutate, save once

use super::error::{EngineError, EngineResult};
use super::locks::{acquire, try_acquire};
use super::SessionEngine;
use crate::graph::{MetadataIndex, Node, NodeId, NodeKind, SessionId, Table, Value};
use crate::storage::SessionStore;
use tracing::{debug, info, warn};

/// Result of a derivation, registered as a new node
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Table(Table),
    Scalar(Value),
}

/// A loaded index plus the session lock, handed to transaction closures
///
/// Nothing reaches the persisted index until the closure returns `Ok`; then
/// the index is saved once. Table payloads are written eagerly and removed
/// again if the transaction fails.
pub struct SessionTxn<'a> {
    store: &'a dyn SessionStore,
    session: SessionId,
    index: MetadataIndex,
    written: Vec<NodeId>,
    dirty: bool,
}

impl<'a> SessionTxn<'a> {
    fn new(store: &'a dyn SessionStore, session: SessionId, index: MetadataIndex) -> Self {
        Self {
            store,
            session,
            index,
            written: Vec::new(),
            dirty: false,
        }
    }

    /// The index as modified so far
    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    /// Look up a node, failing with `NodeNotFound`
    pub fn require_node(&self, id: &NodeId) -> EngineResult<&Node> {
        self.index
            .get_node(id)
            .ok_or_else(|| EngineError::NodeNotFound {
                session: self.session.clone(),
                node: id.clone(),
            })
    }

    /// Read the table behind a Data node
    ///
    /// Scalar nodes have no table (`InvalidArgument`); a Data node whose
    /// payload has vanished is `Corrupt`.
    pub fn read_table(&self, id: &NodeId) -> EngineResult<Table> {
        let node = self.require_node(id)?;
        if let NodeKind::Scalar = node.kind {
            return Err(EngineError::invalid(format!(
                "node {id} is a {} node and has no table",
                node.kind.label()
            )));
        }
        read_data_payload(self.store, &self.session, id)
    }

    /// Write a table payload and register a Data node for it
    pub fn add_data_node(&mut self, table: &Table, name: impl Into<String>) -> EngineResult<NodeId> {
        let node = Node::data(name, table.columns().to_vec());
        self.store.put_table(&self.session, &node.id, table)?;
        self.written.push(node.id.clone());
        debug!(session = %self.session, node = %node.id, rows = table.row_count(), "wrote table payload");
        self.dirty = true;
        Ok(self.index.add_node(node))
    }

    /// Register a Scalar node; the value is stored inline in the index
    ///
    /// NaN and infinities are `InvalidArgument`, since the index could not
    /// persist them.
    pub fn add_scalar_node(&mut self, value: Value, name: impl Into<String>) -> EngineResult<NodeId> {
        if !value.is_finite() {
            return Err(EngineError::invalid(format!(
                "scalar {:?} is not a finite number",
                value.as_f64().unwrap_or_default()
            )));
        }
        self.dirty = true;
        Ok(self.index.add_scalar_node(value, name))
    }

    /// Record that `dst` was derived from `src`. Endpoints are not checked.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, operation: impl Into<String>) {
        self.dirty = true;
        self.index.add_edge(src, dst, operation);
    }

    fn commit(mut self) -> EngineResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Err(e) = self.store.save_index(&self.session, &self.index) {
            self.rollback();
            return Err(e.into());
        }
        debug!(
            session = %self.session,
            nodes = self.index.node_count(),
            edges = self.index.edge_count(),
            "saved index"
        );
        Ok(())
    }

    /// Best-effort removal of payloads this transaction wrote
    fn rollback(&mut self) {
        for id in self.written.drain(..) {
            if let Err(e) = self.store.delete_table(&self.session, &id) {
                warn!(session = %self.session, node = %id, error = %e, "could not remove payload of rolled-back transaction");
            }
        }
    }
}

/// Read a Data node's table, reporting a missing payload as corruption
pub(crate) fn read_data_payload(
    store: &dyn SessionStore,
    session: &SessionId,
    id: &NodeId,
) -> EngineResult<Table> {
    match store.get_table(session, id) {
        Ok(table) => Ok(table),
        Err(e) if e.is_not_found() => Err(EngineError::corrupt(format!(
            "data node {id} in session {session} has no payload"
        ))),
        Err(e) => Err(e.into()),
    }
}

impl SessionEngine {
    /// Run `f` as one transaction on the session, waiting for the session lock
    ///
    /// The index is saved once if `f` succeeds and changed it. If `f` fails
    /// the persisted index is untouched and payloads written by `f` are
    /// removed.
    pub fn with_session<T, F>(&self, session: &SessionId, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut SessionTxn<'_>) -> EngineResult<T>,
    {
        let lock = self.locks.handle(session);
        let _guard = acquire(&lock);
        self.run_txn(session, f)
    }

    /// Like `with_session`, but fails with `Conflict` instead of waiting
    pub fn try_with_session<T, F>(&self, session: &SessionId, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut SessionTxn<'_>) -> EngineResult<T>,
    {
        let lock = self.locks.handle(session);
        let Some(_guard) = try_acquire(&lock) else {
            return Err(EngineError::Conflict(session.clone()));
        };
        self.run_txn(session, f)
    }

    fn run_txn<T, F>(&self, session: &SessionId, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut SessionTxn<'_>) -> EngineResult<T>,
    {
        let index = self.load(session)?;
        let mut txn = SessionTxn::new(self.store.as_ref(), session.clone(), index);
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                warn!(session = %session, error = %e, "transaction rolled back");
                txn.rollback();
                Err(e)
            }
        }
    }

    /// Register an uploaded table as a root node (no inbound edge)
    pub fn upload_table(
        &self,
        session: &SessionId,
        table: &Table,
        name: impl Into<String>,
    ) -> EngineResult<NodeId> {
        let name = name.into();
        let id = self.with_session(session, |txn| txn.add_data_node(table, name.as_str()))?;
        info!(session = %session, node = %id, name = %name, "uploaded table");
        Ok(id)
    }

    /// Derive a new node from `source` and record the provenance edge
    ///
    /// The source is validated before `compute` runs. The new node is named
    /// after `operation`. Node, edge and index save form one transaction.
    pub fn derive<F>(
        &self,
        session: &SessionId,
        source: &NodeId,
        operation: &str,
        compute: F,
    ) -> EngineResult<NodeId>
    where
        F: FnOnce(&Table) -> EngineResult<Derived>,
    {
        let id = self.with_session(session, |txn| {
            let input = txn.read_table(source)?;
            let id = match compute(&input)? {
                Derived::Table(table) => txn.add_data_node(&table, operation)?,
                Derived::Scalar(value) => txn.add_scalar_node(value, operation)?,
            };
            txn.add_edge(source.clone(), id.clone(), operation);
            Ok(id)
        })?;
        info!(session = %session, source = %source, node = %id, operation, "derived node");
        Ok(id)
    }
}
