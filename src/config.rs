//! Store configuration.
//!
//! A YAML file selects the backend and its location:
//!
//! ```yaml
//! backend:
//!   kind: filesystem
//!   root: sessions
//! durability: durable
//! log_filter: sessiongraph=debug
//! ```
//!
//! Relative paths resolve against the directory holding the file.
//! `SESSIONGRAPH_ROOT` overrides the root of a filesystem backend.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{Durability, FsStore, OpenStore, SessionStore, SqliteStore, StorageError};

/// Environment variable replacing a filesystem backend's root
pub const ROOT_ENV: &str = "SESSIONGRAPH_ROOT";

const APP_DIR: &str = "sessiongraph";
const SESSIONS_DIR: &str = "sessions";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("open store: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    Filesystem { root: PathBuf },
    Sqlite { path: PathBuf },
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Filesystem { .. } => "filesystem",
            Backend::Sqlite { .. } => "sqlite",
        }
    }

    fn resolve_against(&mut self, base: &Path) {
        let path = match self {
            Backend::Filesystem { root } => root,
            Backend::Sqlite { path } => path,
        };
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: Backend,
    #[serde(default)]
    pub durability: Durability,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            backend: Backend::Filesystem {
                root: base.join(APP_DIR).join(SESSIONS_DIR),
            },
            durability: Durability::default(),
            log_filter: None,
        }
    }
}

impl StoreConfig {
    /// Filesystem backend at `root`
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Filesystem { root: root.into() },
            ..Self::default()
        }
    }

    /// SQLite backend at `path`
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Sqlite { path: path.into() },
            ..Self::default()
        }
    }

    /// Parse YAML; relative paths are left as written
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Read a config file, resolving relative paths against its directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&raw)?;
        if let Some(base) = path.parent() {
            config.backend.resolve_against(base);
        }
        config.apply_root_override(std::env::var_os(ROOT_ENV).map(PathBuf::from));
        Ok(config)
    }

    /// Like `load`, but a missing file yields the default config
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_root_override(std::env::var_os(ROOT_ENV).map(PathBuf::from));
        Ok(config)
    }

    /// Replace the filesystem root; SQLite backends are left alone
    pub fn apply_root_override(&mut self, root: Option<PathBuf>) {
        if let (Some(new_root), Backend::Filesystem { root }) = (root, &mut self.backend) {
            *root = new_root;
        }
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Open the configured backend, creating its directory if needed
    pub fn open_store(&self) -> Result<Arc<dyn SessionStore>, ConfigError> {
        let store: Arc<dyn SessionStore> = match &self.backend {
            Backend::Filesystem { root } => {
                Arc::new(FsStore::open(root)?.with_durability(self.durability))
            }
            Backend::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        };
        tracing::info!(backend = self.backend.name(), "opened session store");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_filesystem_backend() {
        let config = StoreConfig::from_yaml_str(
            "backend:\n  kind: filesystem\n  root: /var/lib/sessions\ndurability: durable\n",
        )
        .unwrap();

        assert_eq!(
            config.backend,
            Backend::Filesystem {
                root: PathBuf::from("/var/lib/sessions")
            }
        );
        assert_eq!(config.durability, Durability::Durable);
        assert_eq!(config.log_filter, None);
    }

    #[test]
    fn test_durability_defaults_to_best_effort() {
        let config =
            StoreConfig::from_yaml_str("backend:\n  kind: sqlite\n  path: graph.db\n").unwrap();
        assert_eq!(config.durability, Durability::BestEffort);
        assert_eq!(config.backend.name(), "sqlite");
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        let err = StoreConfig::from_yaml_str("backend:\n  kind: postgres\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("store.yaml");
        fs::write(&file, "backend:\n  kind: sqlite\n  path: data/graph.db\n").unwrap();

        let config = StoreConfig::load(&file).unwrap();

        assert_eq!(
            config.backend,
            Backend::Sqlite {
                path: dir.path().join("data/graph.db")
            }
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = StoreConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_root_override_only_touches_filesystem() {
        let mut fs_config = StoreConfig::filesystem("/a");
        fs_config.apply_root_override(Some(PathBuf::from("/b")));
        assert_eq!(fs_config.backend, Backend::Filesystem { root: "/b".into() });

        let mut db_config = StoreConfig::sqlite("/a.db");
        db_config.apply_root_override(Some(PathBuf::from("/b")));
        assert_eq!(db_config.backend, Backend::Sqlite { path: "/a.db".into() });
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = StoreConfig::sqlite("/tmp/graph.db");
        config.log_filter = Some("sessiongraph=debug".into());
        let parsed = StoreConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_open_store_creates_sessions() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::filesystem(dir.path().join("sessions"));
        let store = config.open_store().unwrap();

        assert!(dir.path().join("sessions").is_dir());
        assert!(store.list_sessions().unwrap().is_empty());
    }
}
