//! Provenance edges

use super::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed provenance link: `dst_id` was derived from `src_id` by `operation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Node the derivation read from
    pub src_id: NodeId,
    /// Node the derivation produced
    pub dst_id: NodeId,
    /// Free-text description of the transformation, e.g. "mean(age)"
    pub operation: String,
    /// When the edge was recorded
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge
    pub fn new(src_id: NodeId, dst_id: NodeId, operation: impl Into<String>) -> Self {
        Self {
            src_id,
            dst_id,
            operation: operation.into(),
            created_at: Utc::now(),
        }
    }
}
