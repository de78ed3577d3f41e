//! Configuration loading and management.

use crate::import::stream::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LINE_BYTES, StreamLimits};
use crate::import::{DedupePolicy, ImportPolicy, OrphanHandling};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "task-graph/config.yaml";

/// Tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

/// Store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-graph/tasks.db")
}

/// Defaults applied to import runs unless the command line overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub dedupe: DedupePolicy,

    #[serde(default)]
    pub orphan_handling: OrphanHandling,

    #[serde(default)]
    pub atomic: bool,

    /// Records per streamed chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            dedupe: DedupePolicy::default(),
            orphan_handling: OrphanHandling::default(),
            atomic: false,
            chunk_size: default_chunk_size(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

impl ImportConfig {
    pub fn policy(&self) -> ImportPolicy {
        ImportPolicy {
            dedupe: self.dedupe,
            orphan_handling: self.orphan_handling,
            dry_run: false,
            atomic: self.atomic,
        }
    }

    pub fn limits(&self) -> StreamLimits {
        StreamLimits {
            chunk_size: self.chunk_size,
            max_line_bytes: self.max_line_bytes,
        }
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// User-level config file, e.g. `~/.config/task-graph/config.yaml`.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("task-graph").join("config.yaml"))
    }

    /// Load configuration from default locations or return defaults.
    ///
    /// Environment variables are applied on top of whichever source won.
    pub fn load_or_default() -> Self {
        let mut config = std::iter::once(PathBuf::from(LOCAL_CONFIG_PATH))
            .chain(Self::user_config_path())
            .filter(|path| path.exists())
            .find_map(|path| match Self::load(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(db_path) = std::env::var("TASK_GRAPH_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(size) = std::env::var("TASK_GRAPH_IMPORT_CHUNK_SIZE")
            && let Ok(size) = size.parse()
        {
            self.import.chunk_size = size;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
