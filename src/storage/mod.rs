//! Storage backends for session state
//!
//! A backend implements both `MetadataStore` (one index per session) and
//! `PayloadStore` (one table per Data node). `FsStore` keeps plain files in a
//! directory tree; `SqliteStore` keeps everything in one database file.

mod fs;
mod sqlite;
mod traits;

pub use fs::{Durability, FsStore};
pub use sqlite::SqliteStore;
pub use traits::{
    MetadataStore, OpenStore, PayloadStore, SessionStore, StorageError, StorageResult,
};
