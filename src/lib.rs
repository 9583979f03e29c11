//! Sessiongraph: Provenance Graphs for Tabular Analysis Sessions
//!
//! A storage and graph engine that records, per analysis session, which
//! tables and scalar results were derived from which, by what operation.
//!
//! # Core Concepts
//!
//! - **Sessions**: Named workspaces, each with one persisted metadata index
//! - **Nodes**: Data nodes (a stored table) or Scalar nodes (an inline value)
//! - **Edges**: `src -> dst` provenance links labelled with the operation
//! - **Cascading delete**: Removing a node removes everything derived from it
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sessiongraph::{Derived, SessionEngine, SqliteStore, Table, Value};
//!
//! let store = Arc::new(SqliteStore::open_in_memory().unwrap());
//! let engine = SessionEngine::new(store);
//!
//! let session = engine.create_session("demo").unwrap();
//! let table = Table::new(vec!["x".into()], vec![vec![Value::Int(4)]]).unwrap();
//! let raw = engine.upload_table(&session, &table, "raw").unwrap();
//! let count = engine
//!     .derive(&session, &raw, "count", |t| {
//!         Ok(Derived::Scalar(Value::Int(t.row_count() as i64)))
//!     })
//!     .unwrap();
//!
//! assert_eq!(engine.get_metadata(&session).unwrap().edges[0].dst_id, count);
//! ```

pub mod api;
pub mod config;
mod engine;
mod graph;
pub mod storage;
pub mod telemetry;

pub use api::{SessionApi, SessionReader};
pub use config::{Backend, ConfigError, StoreConfig};
pub use engine::{
    CascadeReport, ConsistencyReport, Derived, EngineError, EngineResult, ErrorKind,
    SessionEngine, SessionTxn,
};
pub use graph::{
    Edge, EdgeIndex, MetadataIndex, Node, NodeId, NodeKind, NodePayload, SessionId, Table,
    TableError, Value,
};
pub use storage::{
    Durability, FsStore, MetadataStore, OpenStore, PayloadStore, SessionStore, SqliteStore,
    StorageError, StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
