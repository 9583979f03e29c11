//! Read-only consistency check between a session's index and its payloads

use super::error::EngineResult;
use super::locks::acquire;
use super::SessionEngine;
use crate::graph::{Edge, NodeId, NodeKind, SessionId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Everything found wrong with one session; empty when consistent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsistencyReport {
    /// Edges with an endpoint missing from the node list
    pub dangling_edges: Vec<Edge>,
    /// Node ids listed more than once
    pub duplicate_nodes: Vec<NodeId>,
    /// Data nodes without a table payload
    pub missing_payloads: Vec<NodeId>,
    /// Scalar nodes without a `scalar_map` entry
    pub missing_scalars: Vec<NodeId>,
    /// `scalar_map` entries not belonging to a scalar node
    pub stray_scalars: Vec<NodeId>,
    /// Table payloads not belonging to a data node
    pub orphan_payloads: Vec<NodeId>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.dangling_edges.is_empty()
            && self.duplicate_nodes.is_empty()
            && self.missing_payloads.is_empty()
            && self.missing_scalars.is_empty()
            && self.stray_scalars.is_empty()
            && self.orphan_payloads.is_empty()
    }
}

impl SessionEngine {
    /// Check referential integrity and payload placement for a session
    ///
    /// Holds the session lock so the index and payload listing describe the
    /// same moment. Nothing is repaired.
    pub fn verify(&self, session: &SessionId) -> EngineResult<ConsistencyReport> {
        let lock = self.locks.handle(session);
        let _guard = acquire(&lock);

        let index = self.load(session)?;
        let payloads: BTreeSet<NodeId> = self.store.list_tables(session)?.into_iter().collect();
        let mut report = ConsistencyReport::default();

        let mut seen: HashMap<&NodeId, &NodeKind> = HashMap::new();
        for node in index.nodes() {
            if seen.insert(&node.id, &node.kind).is_some() {
                report.duplicate_nodes.push(node.id.clone());
            }
        }

        for edge in index.edges() {
            if !seen.contains_key(&edge.src_id) || !seen.contains_key(&edge.dst_id) {
                report.dangling_edges.push(edge.clone());
            }
        }

        for node in index.nodes() {
            match node.kind {
                NodeKind::Data { .. } => {
                    if !payloads.contains(&node.id) {
                        report.missing_payloads.push(node.id.clone());
                    }
                }
                NodeKind::Scalar => {
                    if index.scalar(&node.id).is_none() {
                        report.missing_scalars.push(node.id.clone());
                    }
                }
            }
        }

        for id in index.scalar_map.keys() {
            if !matches!(seen.get(id), Some(NodeKind::Scalar)) {
                report.stray_scalars.push(id.clone());
            }
        }

        for id in payloads {
            if !matches!(seen.get(&id), Some(NodeKind::Data { .. })) {
                report.orphan_payloads.push(id);
            }
        }

        Ok(report)
    }
}
