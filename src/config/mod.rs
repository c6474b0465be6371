//! Configuration management for typeload

pub mod schema;

pub use schema::Config;

use crate::error::{TypeLoadError, TypeLoadResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typeload")
            .join("config.toml")
    }

    /// Get the default declaration cache directory
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typeload")
            .join("types")
    }

    /// Resolve the cache directory, honoring the config override
    pub fn resolve_cache_dir(config: &Config) -> PathBuf {
        config.cache.dir.clone().unwrap_or_else(Self::cache_dir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> TypeLoadResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> TypeLoadResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TypeLoadError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| TypeLoadError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> TypeLoadResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            TypeLoadError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> TypeLoadResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TypeLoadError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the cache directory exists
    pub async fn ensure_state_dirs(config: &Config) -> TypeLoadResult<()> {
        let dir = Self::resolve_cache_dir(config);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| TypeLoadError::io(format!("creating directory {}", dir.display()), e))?;
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
