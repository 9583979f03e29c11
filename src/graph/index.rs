//! Session ids and the metadata index: the persisted provenance graph of one session

use super::edge::Edge;
use super::node::{Node, NodeId};
use super::table::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Unique identifier for a session
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new random SessionId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a SessionId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The aggregate root of a session
///
/// Nodes, edges and inline scalar values are read and written as one unit.
/// Node order is creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataIndex {
    /// Human-readable session name
    pub session_name: String,
    /// Nodes in creation order
    pub nodes: Vec<Node>,
    /// Provenance edges in creation order
    pub edges: Vec<Edge>,
    /// Inline payloads of scalar nodes
    pub scalar_map: BTreeMap<NodeId, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MetadataIndex {
    /// An empty index for a new session
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            scalar_map: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Append a node entry
    ///
    /// An entry with the same id is replaced in place, so a retried write
    /// never duplicates a node.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
        self.touch();
        id
    }

    /// Register a scalar node whose value is stored inline in `scalar_map`
    ///
    /// Only the in-memory index changes; the caller saves it.
    pub fn add_scalar_node(&mut self, value: Value, name: impl Into<String>) -> NodeId {
        let node = Node::scalar(name);
        let id = node.id.clone();
        self.scalar_map.insert(id.clone(), value);
        self.add_node(node)
    }

    /// Append a provenance edge. Endpoints are not checked here.
    pub fn add_edge(&mut self, src_id: NodeId, dst_id: NodeId, operation: impl Into<String>) {
        self.edges.push(Edge::new(src_id, dst_id, operation));
        self.touch();
    }

    /// Get a node by ID
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Inline value of a scalar node
    pub fn scalar(&self, id: &NodeId) -> Option<&Value> {
        self.scalar_map.get(id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Edges whose source is `id`
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.src_id == id)
    }

    /// Edges whose destination is `id`
    pub fn incoming<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.dst_id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Drop node entries, their scalar values, and every edge touching them
    ///
    /// Returns the number of edges removed.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) -> usize {
        if ids.is_empty() {
            return 0;
        }
        self.nodes.retain(|n| !ids.contains(&n.id));
        self.scalar_map.retain(|id, _| !ids.contains(id));
        let before = self.edges.len();
        self.edges
            .retain(|e| !ids.contains(&e.src_id) && !ids.contains(&e.dst_id));
        self.touch();
        before - self.edges.len()
    }

    /// Update the last modified timestamp
    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
