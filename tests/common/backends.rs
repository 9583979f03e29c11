//! Fresh engines over each storage backend

use sessiongraph::{FsStore, OpenStore, SessionEngine, SessionId, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

/// An engine plus whatever keeps its storage alive
pub struct TestBackend {
    pub name: &'static str,
    pub engine: Arc<SessionEngine>,
    root: Option<PathBuf>,
    _dir: Option<TempDir>,
}

impl TestBackend {
    pub fn filesystem() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().join("sessions");
        let store = FsStore::open(&root).expect("open fs store");
        Self {
            name: "filesystem",
            engine: Arc::new(SessionEngine::new(Arc::new(store))),
            root: Some(root),
            _dir: Some(dir),
        }
    }

    pub fn sqlite() -> Self {
        let store = SqliteStore::open_in_memory().expect("open sqlite store");
        Self {
            name: "sqlite",
            engine: Arc::new(SessionEngine::new(Arc::new(store))),
            root: None,
            _dir: None,
        }
    }

    /// Number of table payload files on disk; `None` for non-file backends
    pub fn payload_files(&self, session: &SessionId) -> Option<usize> {
        let root = self.root.as_ref()?;
        let count = WalkDir::new(root.join(session.as_str()))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".table.json"))
            .count();
        Some(count)
    }

    /// Raw bytes of the persisted index; `None` for non-file backends
    pub fn metadata_bytes(&self, session: &SessionId) -> Option<Vec<u8>> {
        let root = self.root.as_ref()?;
        Some(std::fs::read(root.join(session.as_str()).join("metadata.json")).expect("read metadata"))
    }
}

/// One fresh backend of each kind
pub fn backends() -> Vec<TestBackend> {
    vec![TestBackend::filesystem(), TestBackend::sqlite()]
}
