//! Filesystem storage backend
//!
//! One directory per session under the store root:
//!
//! ```text
//! <root>/<session_id>/metadata.json
//! <root>/<session_id>/<node_id>.table.json
//! ```
//!
//! Every file is written to a temporary sibling and atomically renamed into
//! place, so a reader never sees a truncated index or payload.

use super::traits::{MetadataStore, OpenStore, PayloadStore, StorageError, StorageResult};
use crate::graph::{MetadataIndex, NodeId, SessionId, Table};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const METADATA_FILE: &str = "metadata.json";
const PAYLOAD_SUFFIX: &str = ".table.json";

/// How hard a write tries to reach stable storage before it is renamed
/// into place
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Temp file plus atomic rename, no fsync
    #[default]
    BestEffort,
    /// Also fsync the file before the rename and the directory after it
    Durable,
}

/// Directory-per-session store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    durability: Durability,
}

impl FsStore {
    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    fn session_dir(&self, session: &SessionId) -> StorageResult<PathBuf> {
        Ok(self.root.join(path_segment(session.as_str())?))
    }

    fn metadata_path(&self, session: &SessionId) -> StorageResult<PathBuf> {
        Ok(self.session_dir(session)?.join(METADATA_FILE))
    }

    fn payload_path(&self, session: &SessionId, node: &NodeId) -> StorageResult<PathBuf> {
        let file = format!("{}{}", path_segment(node.as_str())?, PAYLOAD_SUFFIX);
        Ok(self.session_dir(session)?.join(file))
    }

    /// Session directory, or `NotFound` if the session has no index
    fn existing_session_dir(&self, session: &SessionId) -> StorageResult<PathBuf> {
        let dir = self.session_dir(session)?;
        if dir.join(METADATA_FILE).is_file() {
            Ok(dir)
        } else {
            Err(StorageError::NotFound(format!("session {session}")))
        }
    }

    fn write_atomic(&self, dir: &Path, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        if self.durability == Durability::Durable {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
        if self.durability == Durability::Durable {
            sync_dir(dir)?;
        }
        Ok(())
    }
}

/// Reject ids that would escape or collide inside the session directory
fn path_segment(id: &str) -> StorageResult<&str> {
    let unsafe_char = id
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '\0' | ':') || c.is_control());
    if id.is_empty() || id.starts_with('.') || unsafe_char {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(id)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> StorageResult<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

impl OpenStore for FsStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            durability: Durability::default(),
        })
    }
}

impl MetadataStore for FsStore {
    fn create_session(&self, session: &SessionId, index: &MetadataIndex) -> StorageResult<()> {
        let dir = self.session_dir(session)?;
        match fs::create_dir(&dir) {
            Ok(()) => {}
            // A directory without an index is left over from a failed create
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if dir.join(METADATA_FILE).exists() {
                    return Err(StorageError::AlreadyExists(session.to_string()));
                }
            }
            Err(e) => return Err(e.into()),
        }
        let bytes = serde_json::to_vec(index)?;
        self.write_atomic(&dir, &dir.join(METADATA_FILE), &bytes)
    }

    fn load_index(&self, session: &SessionId) -> StorageResult<MetadataIndex> {
        let path = self.metadata_path(session)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("session {session}")));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::corrupt(format!("index of session {session}"), e))
    }

    fn save_index(&self, session: &SessionId, index: &MetadataIndex) -> StorageResult<()> {
        let dir = self.existing_session_dir(session)?;
        let bytes = serde_json::to_vec(index)?;
        self.write_atomic(&dir, &dir.join(METADATA_FILE), &bytes)
    }

    fn session_exists(&self, session: &SessionId) -> StorageResult<bool> {
        match self.metadata_path(session) {
            Ok(path) => Ok(path.is_file()),
            Err(StorageError::InvalidId(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_sessions(&self) -> StorageResult<Vec<SessionId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.path().join(METADATA_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(SessionId::from(name));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl PayloadStore for FsStore {
    fn put_table(&self, session: &SessionId, node: &NodeId, table: &Table) -> StorageResult<()> {
        let dir = self.existing_session_dir(session)?;
        let path = self.payload_path(session, node)?;
        let bytes = serde_json::to_vec(table)?;
        self.write_atomic(&dir, &path, &bytes)
    }

    fn get_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<Table> {
        let path = self.payload_path(session, node)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!(
                    "payload {node} in session {session}"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let what = || format!("payload {node} in session {session}");
        let table: Table =
            serde_json::from_slice(&raw).map_err(|e| StorageError::corrupt(what(), e))?;
        table
            .validate()
            .map_err(|e| StorageError::corrupt(what(), e))?;
        Ok(table)
    }

    fn delete_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<()> {
        let path = self.payload_path(session, node)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(format!(
                "payload {node} in session {session}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn has_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<bool> {
        Ok(self.payload_path(session, node)?.is_file())
    }

    fn list_tables(&self, session: &SessionId) -> StorageResult<Vec<NodeId>> {
        let dir = self.existing_session_dir(session)?;
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(PAYLOAD_SUFFIX) {
                ids.push(NodeId::from(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Value};
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, FsStore) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::open(dir.path().join("sessions")).unwrap();
        (dir, store)
    }

    fn sample_table() -> Table {
        Table::new(
            vec!["age".into(), "city".into()],
            vec![
                vec![Value::Int(30), "Lyon".into()],
                vec![Value::Int(40), "Oslo".into()],
            ],
        )
        .unwrap()
    }

    fn create_session(store: &FsStore) -> SessionId {
        let id = SessionId::new();
        store.create_session(&id, &MetadataIndex::new("test")).unwrap();
        id
    }

    #[test]
    fn test_create_and_load_session() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);

        assert!(store.session_exists(&id).unwrap());
        let index = store.load_index(&id).unwrap();
        assert_eq!(index.session_name, "test");
        assert_eq!(store.list_sessions().unwrap(), vec![id]);
    }

    #[test]
    fn test_create_twice_fails() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        let err = store
            .create_session(&id, &MetadataIndex::new("again"))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn test_load_missing_session_is_not_found() {
        let (_dir, store) = create_test_store();
        let err = store.load_index(&SessionId::from("nope")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.session_exists(&SessionId::from("nope")).unwrap());
    }

    #[test]
    fn test_save_does_not_create_sessions() {
        let (_dir, store) = create_test_store();
        let err = store
            .save_index(&SessionId::from("ghost"), &MetadataIndex::new("ghost"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_garbled_index_is_corrupt() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        fs::write(store.metadata_path(&id).unwrap(), b"{\"session_name\": ").unwrap();

        let err = store.load_index(&id).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_save_replaces_index() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);

        let mut index = store.load_index(&id).unwrap();
        index.add_node(Node::data("upload", vec!["a".into()]));
        store.save_index(&id, &index).unwrap();

        assert_eq!(store.load_index(&id).unwrap(), index);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        let index = store.load_index(&id).unwrap();
        for _ in 0..3 {
            store.save_index(&id, &index).unwrap();
        }

        let entries: Vec<_> = fs::read_dir(store.session_dir(&id).unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(METADATA_FILE)]);
    }

    #[test]
    fn test_table_round_trip() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        let node = NodeId::new();

        store.put_table(&id, &node, &sample_table()).unwrap();
        assert!(store.has_table(&id, &node).unwrap());
        assert_eq!(store.get_table(&id, &node).unwrap(), sample_table());
        assert_eq!(store.list_tables(&id).unwrap(), vec![node]);
    }

    #[test]
    fn test_put_table_is_idempotent() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        let node = NodeId::new();

        store.put_table(&id, &node, &sample_table()).unwrap();
        store.put_table(&id, &node, &sample_table()).unwrap();
        assert_eq!(store.list_tables(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_put_table_requires_session() {
        let (_dir, store) = create_test_store();
        let err = store
            .put_table(&SessionId::from("ghost"), &NodeId::new(), &sample_table())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_table() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        let node = NodeId::new();
        store.put_table(&id, &node, &sample_table()).unwrap();

        store.delete_table(&id, &node).unwrap();
        assert!(!store.has_table(&id, &node).unwrap());
        assert!(store.delete_table(&id, &node).unwrap_err().is_not_found());
        assert!(store.get_table(&id, &node).unwrap_err().is_not_found());
    }

    #[test]
    fn test_ragged_payload_is_corrupt() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);
        let node = NodeId::new();
        fs::write(
            store.payload_path(&id, &node).unwrap(),
            br#"{"columns":["a","b"],"rows":[[1]]}"#,
        )
        .unwrap();

        let err = store.get_table(&id, &node).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_path_like_ids_are_rejected() {
        let (_dir, store) = create_test_store();
        let id = create_session(&store);

        for bad in ["../escape", "a/b", ".hidden", ""] {
            let err = store
                .put_table(&id, &NodeId::from(bad), &sample_table())
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidId(_)), "{bad}");
        }
        assert!(!store.session_exists(&SessionId::from("../x")).unwrap());
    }

    #[test]
    fn test_durable_writes() {
        let (_dir, store) = create_test_store();
        let store = store.with_durability(Durability::Durable);
        let id = create_session(&store);
        let node = NodeId::new();
        store.put_table(&id, &node, &sample_table()).unwrap();
        assert_eq!(store.get_table(&id, &node).unwrap(), sample_table());
    }
}
