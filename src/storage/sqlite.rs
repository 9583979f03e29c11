//! SQLite storage backend

use super::traits::{MetadataStore, OpenStore, PayloadStore, StorageError, StorageResult};
use crate::graph::{MetadataIndex, NodeId, SessionId, Table};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed session store
///
/// Uses a single database file with one row per session holding the whole
/// serialized index, and one row per table payload. Every index save is a
/// single UPDATE, so it is atomic for readers.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                index_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS payloads (
                session_id TEXT NOT NULL,
                node_id TEXT NOT NULL,
                table_json TEXT NOT NULL,
                PRIMARY KEY (session_id, node_id),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            PRAGMA foreign_keys = ON;

            -- Concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    /// Create an in-memory store (useful for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn session_exists_in(conn: &Connection, session: &SessionId) -> StorageResult<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?1",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn payload_not_found(session: &SessionId, node: &NodeId) -> StorageError {
        StorageError::NotFound(format!("payload {node} in session {session}"))
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetadataStore for SqliteStore {
    fn create_session(&self, session: &SessionId, index: &MetadataIndex) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let index_json = serde_json::to_string(index)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO sessions (id, name, index_json) VALUES (?1, ?2, ?3)",
            params![session.as_str(), index.session_name, index_json],
        )?;
        if inserted == 0 {
            return Err(StorageError::AlreadyExists(session.to_string()));
        }
        Ok(())
    }

    fn load_index(&self, session: &SessionId) -> StorageResult<MetadataIndex> {
        let conn = self.conn.lock().unwrap();
        let index_json: Option<String> = conn
            .query_row(
                "SELECT index_json FROM sessions WHERE id = ?1",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(index_json) = index_json else {
            return Err(StorageError::NotFound(format!("session {session}")));
        };
        serde_json::from_str(&index_json)
            .map_err(|e| StorageError::corrupt(format!("index of session {session}"), e))
    }

    fn save_index(&self, session: &SessionId, index: &MetadataIndex) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let index_json = serde_json::to_string(index)?;
        let updated = conn.execute(
            "UPDATE sessions SET name = ?2, index_json = ?3 WHERE id = ?1",
            params![session.as_str(), index.session_name, index_json],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("session {session}")));
        }
        Ok(())
    }

    fn session_exists(&self, session: &SessionId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        Self::session_exists_in(&conn, session)
    }

    fn list_sessions(&self) -> StorageResult<Vec<SessionId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM sessions ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(SessionId::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl PayloadStore for SqliteStore {
    fn put_table(&self, session: &SessionId, node: &NodeId, table: &Table) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        if !Self::session_exists_in(&conn, session)? {
            return Err(StorageError::NotFound(format!("session {session}")));
        }
        let table_json = serde_json::to_string(table)?;
        conn.execute(
            r#"
            INSERT INTO payloads (session_id, node_id, table_json)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id, node_id) DO UPDATE SET
                table_json = excluded.table_json
            "#,
            params![session.as_str(), node.as_str(), table_json],
        )?;
        Ok(())
    }

    fn get_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<Table> {
        let conn = self.conn.lock().unwrap();
        let table_json: Option<String> = conn
            .query_row(
                "SELECT table_json FROM payloads WHERE session_id = ?1 AND node_id = ?2",
                params![session.as_str(), node.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(table_json) = table_json else {
            return Err(Self::payload_not_found(session, node));
        };
        let what = || format!("payload {node} in session {session}");
        let table: Table =
            serde_json::from_str(&table_json).map_err(|e| StorageError::corrupt(what(), e))?;
        table
            .validate()
            .map_err(|e| StorageError::corrupt(what(), e))?;
        Ok(table)
    }

    fn delete_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM payloads WHERE session_id = ?1 AND node_id = ?2",
            params![session.as_str(), node.as_str()],
        )?;
        if rows == 0 {
            return Err(Self::payload_not_found(session, node));
        }
        Ok(())
    }

    fn has_table(&self, session: &SessionId, node: &NodeId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM payloads WHERE session_id = ?1 AND node_id = ?2",
                params![session.as_str(), node.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_tables(&self, session: &SessionId) -> StorageResult<Vec<NodeId>> {
        let conn = self.conn.lock().unwrap();
        if !Self::session_exists_in(&conn, session)? {
            return Err(StorageError::NotFound(format!("session {session}")));
        }
        let mut stmt = conn
            .prepare("SELECT node_id FROM payloads WHERE session_id = ?1 ORDER BY node_id")?;
        let ids = stmt
            .query_map(params![session.as_str()], |row| row.get::<_, String>(0))?
            .map(|r| r.map(NodeId::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
