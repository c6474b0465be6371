//! Configuration schema for typeload
//!
//! Configuration is stored at `~/.config/typeload/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote registry settings
    pub registry: RegistryConfig,

    /// Persistent cache settings
    pub cache: CacheConfig,

    /// Library loading settings
    pub loader: LoaderConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Remote registry the declarations are fetched from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL packages are resolved against
    pub base_url: String,

    /// Response header naming the declaration entry point
    pub types_header: String,

    /// Query appended to the package URL when the header is absent
    pub fallback_query: String,

    /// Virtual module root the registry origin is rewritten to
    pub virtual_root: String,

    /// Per-request timeout in seconds (None = transport default)
    pub request_timeout_secs: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://esm.sh".to_string(),
            types_header: "X-TypeScript-Types".to_string(),
            fallback_query: "dts".to_string(),
            virtual_root: "file:///node_modules/".to_string(),
            request_timeout_secs: None,
        }
    }
}

/// Persistent cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the persistent cache (default: true)
    pub enabled: bool,

    /// Key prefix reserved for this cache
    pub namespace: String,

    /// Entry lifetime in hours
    pub max_age_hours: u32,

    /// Total size budget in MB before eviction
    pub max_size_mb: u32,

    /// Fraction of the oldest entries evicted when over budget
    pub eviction_fraction: f64,

    /// Revalidate ETag-tagged entries with a HEAD probe on read
    pub revalidate: bool,

    /// Cache directory override
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "typeload-cache-".to_string(),
            max_age_hours: 24,
            max_size_mb: 50,
            eviction_fraction: 0.3,
            revalidate: true,
            dir: None,
        }
    }
}

/// Library loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Libraries eligible for automatic type loading
    pub allowed: Vec<String>,

    /// Host-provided modules never loaded from the registry
    pub builtins: Vec<String>,

    /// Number of libraries loaded concurrently per batch
    pub batch_size: usize,

    /// Register inferred component prop shapes for named imports
    pub infer_components: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            allowed: [
                "@vapor-ui/core",
                "@vapor-ui/icons",
                "lodash",
                "clsx",
                "zod",
                "date-fns",
                "axios",
                "framer-motion",
                "zustand",
                "@tanstack/react-query",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            builtins: vec![
                "react".to_string(),
                "react-dom".to_string(),
                "react/jsx-runtime".to_string(),
            ],
            batch_size: 3,
            infer_components: true,
        }
    }
}
