//! Configuration for embedding the library: storage backend selection,
//! cache sizing, deferred-write batching and logging.
//!
//! Supports TOML files and a handful of environment overrides, following
//! the same file-then-env-then-default precedence the rest of this
//! lineage's services use.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EventSpaceError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub deferred_write: DeferredWriteConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
            deferred_write: DeferredWriteConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Which storage adapter to use and where it keeps its data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

/// Sizing for the PState value cache and ref-resolution cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub value_cache_capacity: usize,
    pub ref_cache_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            value_cache_capacity: 10_000,
            ref_cache_capacity: 10_000,
        }
    }
}

/// Batching behavior for the deferred write-back actor (see
/// [`crate::application::migration`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredWriteConfig {
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub queue_capacity: usize,
}

impl Default for DeferredWriteConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval_ms: 500,
            queue_capacity: 10_000,
        }
    }
}

/// Logging configuration; wired up by the embedding application via
/// `tracing-subscriber`, not by this crate itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EventSpaceError::AdapterFailure(format!("reading config file: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| EventSpaceError::InvalidInput(format!("invalid config format: {e}")))
    }

    /// Apply `EVENTSPACE_*` environment overrides on top of the given config.
    pub fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("EVENTSPACE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(backend) = std::env::var("EVENTSPACE_BACKEND") {
            self.storage.backend = match backend.as_str() {
                "sqlite" => StorageBackend::Sqlite,
                _ => StorageBackend::Memory,
            };
        }
        self
    }

    /// Load with file → env → default precedence.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_file(path)?
            }
            Some(path) => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Config::default()
            }
            None => Config::default(),
        };
        let config = config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.deferred_write.batch_size == 0 {
            return Err(EventSpaceError::InvalidInput(
                "deferred_write.batch_size must be > 0".to_string(),
            ));
        }
        if self.cache.value_cache_capacity == 0 {
            return Err(EventSpaceError::InvalidInput(
                "cache.value_cache_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| EventSpaceError::InvalidInput(format!("serializing config: {e}")))?;
        fs::write(path.as_ref(), toml)
            .map_err(|e| EventSpaceError::AdapterFailure(format!("writing config file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut config = Config::default();
        config.deferred_write.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.cache.value_cache_capacity, back.cache.value_cache_capacity);
    }
}
