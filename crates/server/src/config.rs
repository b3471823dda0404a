//! Server configuration
//!
//! Loaded from `$ROTA_CONFIG` if set, otherwise from the platform config
//! directory. A missing file yields defaults; a malformed one is an error.

use std::path::PathBuf;

use directories::ProjectDirs;
use rota_core::{Error, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// SQLite file path. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8321".into(),
            database_path: None,
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os("ROTA_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => Self::project_dirs()?.config_dir().join("rota.toml"),
        };

        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| Error::validation(format!("invalid config {}: {e}", path.display())))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Resolve the database path, creating the parent directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        let path = match &self.database_path {
            Some(p) => p.clone(),
            None => Self::project_dirs()?.data_dir().join("rota.db"),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "rota", "rota").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:8321");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: ServerConfig = toml::from_str("bind = \"0.0.0.0:9000\"").unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_explicit_database_path_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            bind: "127.0.0.1:0".into(),
            database_path: Some(dir.path().join("nested/rota.db")),
        };
        let path = config.database_path().unwrap();
        assert!(path.parent().unwrap().exists());
    }
}
