use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "pg_client_config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to create config directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    connection_string: String,
}

/// Single-entry JSON store for the last used connection string.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored connection string, or an empty string when the file
    /// is missing or unreadable.
    #[must_use]
    pub fn load(&self) -> String {
        match self.try_load() {
            Ok(connection_string) => connection_string,
            Err(error) => {
                warn!(%error, "failed to load config");
                String::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<String, ConfigError> {
        if !self.path.exists() {
            return Ok(String::new());
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(String::new());
        }

        let doc: ConfigDocument =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(doc.connection_string)
    }

    pub fn save(&self, connection_string: &str) -> Result<(), ConfigError> {
        if let Some(parent_dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent_dir).map_err(|source| ConfigError::CreateDir {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let doc = ConfigDocument {
            connection_string: connection_string.to_string(),
        };
        let rendered =
            serde_json::to_string(&doc).map_err(|source| ConfigError::Serialize { source })?;

        fs::write(&self.path, rendered).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{ConfigError, ConfigStore};

    fn temp_store(temp_dir: &TempDir) -> ConfigStore {
        ConfigStore::new(temp_dir.path().join("pg_client_config.json"))
    }

    #[test]
    fn missing_file_loads_empty_string() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = temp_store(&temp_dir);
        assert_eq!(store.load(), "");
    }

    #[test]
    fn save_then_load_round_trips_connection_string() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = temp_store(&temp_dir);

        store
            .save("host=localhost dbname=app user=postgres")
            .expect("save should succeed");
        assert_eq!(store.load(), "host=localhost dbname=app user=postgres");

        let raw = fs::read_to_string(store.path()).expect("config file should exist");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("file should be JSON");
        assert_eq!(
            value,
            serde_json::json!({"connection_string": "host=localhost dbname=app user=postgres"})
        );
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = ConfigStore::new(temp_dir.path().join("nested/dir/config.json"));

        store.save("postgres://localhost/app").expect("save should succeed");
        assert_eq!(store.load(), "postgres://localhost/app");
    }

    #[test]
    fn corrupt_file_loads_empty_but_reports_parse_error() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = temp_store(&temp_dir);
        fs::write(store.path(), "{not json").expect("write should succeed");

        assert_eq!(store.load(), "");
        assert!(matches!(store.try_load(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn document_without_key_loads_empty_string() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = temp_store(&temp_dir);
        fs::write(store.path(), "{\"theme\": \"dark\"}").expect("write should succeed");

        assert_eq!(store.load(), "");
    }
}
