//! CLI configuration loaded from environment variables.
//!
//! Every setting has a default so `hearth` works with no configuration.

use std::path::PathBuf;
use std::sync::Arc;

use hearth_store::kv::default_data_dir;
use hearth_store::{FileStore, MemoryStore, SharedKv, SqliteStore};

/// Which key-value backend holds the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One SQLite database file.
    Sqlite,
    /// One JSON document per key in a directory.
    File,
    /// Nothing survives the process.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "file" | "json" => Ok(Self::File),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Env: `HEARTH_BACKEND` (`sqlite`, `file`, `memory`)
    /// Default: `sqlite`
    pub backend: StorageBackend,

    /// Directory holding the partition.
    /// Env: `HEARTH_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Seed demo content on first sign-in.
    /// Env: `HEARTH_SEED_DEMO` (true/false)
    /// Default: `true`
    pub seed_demo: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            data_dir: None,
            seed_demo: true,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("HEARTH_BACKEND") {
            match val.parse() {
                Ok(backend) => config.backend = backend,
                Err(e) => tracing::warn!(error = %e, "Invalid HEARTH_BACKEND, using sqlite"),
            }
        }

        if let Some(dir) = lookup("HEARTH_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(val) = lookup("HEARTH_SEED_DEMO") {
            config.seed_demo = val != "false" && val != "0";
        }

        config
    }

    fn resolve_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_data_dir()?),
        }
    }

    /// Open the configured key-value backend.
    pub fn open_store(&self) -> anyhow::Result<SharedKv> {
        let kv: SharedKv = match self.backend {
            StorageBackend::Sqlite => {
                let dir = self.resolve_dir()?;
                std::fs::create_dir_all(&dir)?;
                Arc::new(SqliteStore::open_at(&dir.join("hearth.db"))?)
            }
            StorageBackend::File => Arc::new(FileStore::open(self.resolve_dir()?.join("kv"))?),
            StorageBackend::Memory => {
                tracing::warn!("memory backend selected, nothing will be saved");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(kv)
    }
}
