//! Core provenance graph data structures

mod adjacency;
mod edge;
mod index;
mod node;
mod table;


pub use adjacency::EdgeIndex;
pub use edge::Edge;
pub use index::{MetadataIndex, SessionId};
pub use node::{Node, NodeId, NodeKind, NodePayload};
pub use table::{Table, TableError, Value};
