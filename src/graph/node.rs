//! Node representation in the provenance graph

use super::table::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node within a session
///
/// Serializes as a plain string. Fresh ids are UUID v4 strings, but ids
/// handed in by callers are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a NodeId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a node materializes
///
/// A Data node's table lives in the payload store; a Scalar node's value
/// lives inline in the session's `scalar_map`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Data { columns: Vec<String> },
    Scalar,
}

impl NodeKind {
    pub fn is_data(&self) -> bool {
        matches!(self, NodeKind::Data { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, NodeKind::Scalar)
    }

    /// Short label used in logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Data { .. } => "data",
            NodeKind::Scalar => "scalar",
        }
    }
}

/// A node in the provenance graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    #[serde(rename = "node_id")]
    pub id: NodeId,
    /// Display name, usually the operation that produced the node
    pub name: String,
    /// Data or scalar
    #[serde(flatten)]
    pub kind: NodeKind,
    /// When the node was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Create a Data node with a fresh id
    pub fn data(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self::with_id(NodeId::new(), name, NodeKind::Data { columns })
    }

    /// Create a Scalar node with a fresh id
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), name, NodeKind::Scalar)
    }

    pub fn with_id(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Column names of a Data node; empty for scalars
    pub fn columns(&self) -> &[String] {
        match &self.kind {
            NodeKind::Data { columns } => columns,
            NodeKind::Scalar => &[],
        }
    }
}

/// Payload of a node as handed back to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum NodePayload {
    Table(super::table::Table),
    Scalar(Value),
}

impl NodePayload {
    pub fn as_table(&self) -> Option<&super::table::Table> {
        match self {
            NodePayload::Table(table) => Some(table),
            NodePayload::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            NodePayload::Scalar(value) => Some(value),
            NodePayload::Table(_) => None,
        }
    }
}
