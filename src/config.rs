//! Configuration types.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ConfigError, DatabaseError};
use crate::store::{Database, LibSqlBackend, MemoryBackend};

/// Which store the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// libSQL database file at `ServerConfig::db_path`.
    #[default]
    LibSql,
    /// Process-local map; contents are lost on exit.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "libsql" | "sqlite" => Ok(StoreBackend::LibSql),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend '{other}' (expected 'libsql' or 'memory')")),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
    /// Database file for the libSQL backend.
    pub db_path: PathBuf,
    pub backend: StoreBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            db_path: PathBuf::from("./data/todo-list.db"),
            backend: StoreBackend::LibSql,
        }
    }
}

impl ServerConfig {
    /// Read configuration from `TODO_LIST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset keys fall back
    /// to the defaults; set but unparsable keys are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("TODO_LIST_HOST").unwrap_or(defaults.host);

        let port = match lookup("TODO_LIST_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "TODO_LIST_PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        let db_path = lookup("TODO_LIST_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let backend = match lookup("TODO_LIST_DB_BACKEND") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "TODO_LIST_DB_BACKEND".to_string(),
                message,
            })?,
            None => defaults.backend,
        };

        Ok(Self {
            host,
            port,
            db_path,
            backend,
        })
    }

    /// `host:port` for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured store, with migrations applied.
    pub async fn open_database(&self) -> Result<Arc<dyn Database>, DatabaseError> {
        let db: Arc<dyn Database> = match self.backend {
            StoreBackend::LibSql => Arc::new(LibSqlBackend::new_local(&self.db_path).await?),
            StoreBackend::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.backend, StoreBackend::LibSql);
        assert_eq!(config.db_path, PathBuf::from("./data/todo-list.db"));
    }

    #[test]
    fn reads_all_keys() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("TODO_LIST_HOST", "127.0.0.1"),
            ("TODO_LIST_PORT", "3000"),
            ("TODO_LIST_DB_PATH", "/tmp/todos.db"),
            ("TODO_LIST_DB_BACKEND", "Memory"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.db_path, PathBuf::from("/tmp/todos.db"));
        assert_eq!(config.backend, StoreBackend::Memory);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[("TODO_LIST_PORT", "eighty")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TODO_LIST_PORT")
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[("TODO_LIST_DB_BACKEND", "postgres")]))
            .unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }

    #[tokio::test]
    async fn memory_backend_opens_empty() {
        let config = ServerConfig {
            backend: StoreBackend::Memory,
            ..ServerConfig::default()
        };
        let db = config.open_database().await.unwrap();
        assert_eq!(db.count_todos().await.unwrap(), 0);
    }
}
