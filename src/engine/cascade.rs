//! Cascading delete: a node and everything derived from it

use super::error::{EngineError, EngineResult};
use super::locks::acquire;
use super::SessionEngine;
use crate::graph::{EdgeIndex, NodeId, SessionId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of a cascading delete
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeReport {
    /// Removed nodes, children before parents; the requested node is last
    pub removed: Vec<NodeId>,
    /// Number of edges dropped from the index
    pub edges_removed: usize,
    /// Data nodes that had no payload to delete
    pub missing_payloads: Vec<NodeId>,
    /// Payloads whose deletion failed, with the storage error
    pub failed_payloads: Vec<(NodeId, String)>,
    /// Edge destinations that had no node entry
    pub dangling_targets: Vec<NodeId>,
}

impl CascadeReport {
    /// True if the subtree was removed without finding any inconsistency
    pub fn is_clean(&self) -> bool {
        self.missing_payloads.is_empty()
            && self.failed_payloads.is_empty()
            && self.dangling_targets.is_empty()
    }
}

/// Payload handling owed to one removed id
enum Cleanup {
    Data,
    Scalar,
    Dangling,
}

impl SessionEngine {
    /// Delete a node and every node transitively derived from it
    ///
    /// Descendants are followed along outgoing edges regardless of any other
    /// parents they have. The pruned index is committed in a single save,
    /// and only then are table payloads deleted, so an interruption leaves
    /// unreferenced payloads behind rather than index entries without data.
    ///
    /// A missing or undeletable payload does not stop the cascade; the rest
    /// of the subtree is still cleaned up and the call then fails with
    /// `CascadeIncomplete`, carrying the full report.
    pub fn delete_node(&self, session: &SessionId, node: &NodeId) -> EngineResult<CascadeReport> {
        let lock = self.locks.handle(session);
        let _guard = acquire(&lock);

        let mut index = self.load(session)?;
        if !index.contains_node(node) {
            return Err(EngineError::NodeNotFound {
                session: session.clone(),
                node: node.clone(),
            });
        }

        let order = EdgeIndex::build(&index).descendants_post_order(node);
        let plan: Vec<(NodeId, Cleanup)> = order
            .into_iter()
            .map(|id| {
                let cleanup = match index.get_node(&id) {
                    Some(n) if n.kind.is_data() => Cleanup::Data,
                    Some(_) => Cleanup::Scalar,
                    None => Cleanup::Dangling,
                };
                (id, cleanup)
            })
            .collect();

        let doomed: HashSet<NodeId> = plan.iter().map(|(id, _)| id.clone()).collect();
        let edges_removed = index.remove_nodes(&doomed);
        self.store.save_index(session, &index)?;
        debug!(session = %session, root = %node, nodes = doomed.len(), edges_removed, "committed pruned index");

        let mut report = CascadeReport {
            edges_removed,
            ..Default::default()
        };
        for (id, cleanup) in plan {
            match self.store.delete_table(session, &id) {
                Ok(()) => {
                    if !matches!(cleanup, Cleanup::Data) {
                        warn!(session = %session, node = %id, "removed payload not backed by a data node");
                    }
                }
                Err(e) if e.is_not_found() => match cleanup {
                    Cleanup::Data => {
                        warn!(session = %session, node = %id, "data node had no payload");
                        report.missing_payloads.push(id.clone());
                    }
                    Cleanup::Scalar | Cleanup::Dangling => {}
                },
                Err(e) => {
                    warn!(session = %session, node = %id, error = %e, "failed to delete payload");
                    report.failed_payloads.push((id.clone(), e.to_string()));
                }
            }
            match cleanup {
                Cleanup::Dangling => {
                    warn!(session = %session, node = %id, "edge pointed at a node missing from the index");
                    report.dangling_targets.push(id);
                }
                Cleanup::Data | Cleanup::Scalar => report.removed.push(id),
            }
        }

        info!(
            session = %session,
            root = %node,
            removed = report.removed.len(),
            clean = report.is_clean(),
            "cascading delete finished"
        );

        if report.is_clean() {
            Ok(report)
        } else {
            Err(EngineError::CascadeIncomplete {
                root: node.clone(),
                report,
            })
        }
    }
}
