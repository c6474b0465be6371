//! Pipeline factory wiring cache, transport, walker, registrar and loader
//!
//! Every component is constructed once here and shared by `Arc`; nothing in
//! the crate keeps module-level state.

use crate::cache::{CacheSettings, FileStore, KvStore, MemoryStore, PersistentTypeCache};
use crate::config::{Config, ConfigManager};
use crate::error::TypeLoadResult;
use crate::fetch::{Transport, UreqTransport};
use crate::loader::{LoadCoordinator, LoaderSettings};
use crate::registrar::{DirectoryLibraryHost, LibraryHost, MemoryLibraryHost, Registrar};
use crate::walker::{DependencyWalker, WalkerSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Where registered declarations end up
#[derive(Debug, Clone)]
pub enum Output {
    /// Kept in memory; only counts and paths are reported
    Memory,
    /// Written as files below a directory
    Directory(PathBuf),
}

impl From<Option<PathBuf>> for Output {
    fn from(dir: Option<PathBuf>) -> Self {
        dir.map_or(Self::Memory, Self::Directory)
    }
}

/// A fully wired loading pipeline
pub struct Pipeline {
    pub cache: Arc<PersistentTypeCache>,
    pub registrar: Arc<Registrar>,
    pub walker: Arc<DependencyWalker>,
    pub coordinator: LoadCoordinator,
}

impl Pipeline {
    /// Wire a pipeline from explicit collaborators
    pub fn assemble(
        config: &Config,
        store: Arc<dyn KvStore>,
        transport: Arc<dyn Transport>,
        host: Arc<dyn LibraryHost>,
        loader: LoaderSettings,
    ) -> Self {
        let revalidator = config.cache.revalidate.then(|| transport.clone());
        let cache = Arc::new(PersistentTypeCache::new(
            store,
            revalidator,
            CacheSettings::from_config(&config.cache),
        ));
        let registrar = Arc::new(Registrar::new(host, config.registry.virtual_root.clone()));
        let walker = Arc::new(DependencyWalker::new(
            transport,
            cache.clone(),
            registrar.clone(),
            WalkerSettings::from_config(&config.registry),
        ));
        let coordinator = LoadCoordinator::new(walker.clone(), registrar.clone(), loader);

        Self {
            cache,
            registrar,
            walker,
            coordinator,
        }
    }
}

/// Open the configured persistent store
///
/// With caching disabled an in-memory store stands in, so nothing touches
/// the cache directory.
pub async fn open_store(config: &Config) -> TypeLoadResult<Arc<dyn KvStore>> {
    if !config.cache.enabled {
        debug!("Persistent cache disabled, using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    ConfigManager::ensure_state_dirs(config).await?;
    let dir = ConfigManager::resolve_cache_dir(config);
    debug!("Using cache directory {}", dir.display());
    Ok(Arc::new(FileStore::open(dir).await?))
}

/// Create the network transport for the configured registry
pub fn create_transport(config: &Config) -> Arc<dyn Transport> {
    let timeout = config.registry.request_timeout_secs.map(Duration::from_secs);
    Arc::new(UreqTransport::new(timeout))
}

/// Create the library host for `output`
pub fn create_host(output: &Output) -> Arc<dyn LibraryHost> {
    match output {
        Output::Memory => Arc::new(MemoryLibraryHost::new()),
        Output::Directory(dir) => Arc::new(DirectoryLibraryHost::new(dir.clone())),
    }
}

/// Build the production pipeline for `config`
pub async fn create_pipeline(
    config: &Config,
    output: &Output,
    loader: LoaderSettings,
) -> TypeLoadResult<Pipeline> {
    let store = open_store(config).await?;
    Ok(Pipeline::assemble(
        config,
        store,
        create_transport(config),
        create_host(output),
        loader,
    ))
}
