//! Load coordination for library type declarations
//!
//! The coordinator gates loads through an allow-list, deduplicates loads of
//! the same library, and bounds top-level fan-out by loading source-derived
//! libraries in fixed-size batches. A library moves `unloaded -> loading ->
//! loaded` and stays `loaded` after a failure; only an explicit reset makes
//! it loadable again.

pub mod components;
pub mod extract;

use crate::config::schema::LoaderConfig;
use crate::registrar::Registrar;
use crate::walker::DependencyWalker;
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Per-library load state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        };
        write!(f, "{}", name)
    }
}

/// Result of one library load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryLoadResult {
    pub library: String,
    pub success: bool,
}

/// Result of analyzing a source buffer
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    /// Packages referenced by the source after filtering
    pub referenced: Vec<String>,
    /// Loads attempted, in batch order
    pub loads: Vec<LibraryLoadResult>,
    /// Virtual paths of inferred component declarations that were published
    pub inferred: Vec<String>,
}

/// Loader tunables
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub allowed: HashSet<String>,
    pub builtins: HashSet<String>,
    pub batch_size: usize,
    pub infer_components: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

impl LoaderSettings {
    /// Build settings from the `[loader]` config section
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            allowed: config.allowed.iter().cloned().collect(),
            builtins: config.builtins.iter().cloned().collect(),
            batch_size: config.batch_size.max(1),
            infer_components: config.infer_components,
        }
    }
}

/// Coordinates library loads over a shared walker
pub struct LoadCoordinator {
    walker: Arc<DependencyWalker>,
    registrar: Arc<Registrar>,
    settings: LoaderSettings,
    states: Mutex<HashMap<String, LoadState>>,
}

impl LoadCoordinator {
    pub fn new(
        walker: Arc<DependencyWalker>,
        registrar: Arc<Registrar>,
        settings: LoaderSettings,
    ) -> Self {
        Self {
            walker,
            registrar,
            settings,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of `library`
    pub fn state(&self, library: &str) -> LoadState {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(library).copied())
            .unwrap_or(LoadState::Unloaded)
    }

    /// Whether `library` may be loaded at all
    pub fn is_allowed(&self, library: &str) -> bool {
        self.settings.allowed.contains(library)
    }

    pub fn allowed_count(&self) -> usize {
        self.settings.allowed.len()
    }

    /// Load the types of one library
    ///
    /// Returns `true` immediately if the library is loading or loaded, and
    /// `false` without any I/O if it is not allow-listed. Otherwise returns
    /// whether the entry point was obtained.
    pub async fn load_library(&self, library: &str) -> bool {
        if !self.begin(library) {
            return self.is_allowed(library);
        }

        let outcome = self.walker.fetch_entry(library).await;
        self.set_state(library, LoadState::Loaded);

        match outcome {
            Ok(report) => {
                info!(
                    "Loaded types for {} ({} files, {} from cache)",
                    library,
                    report.files(),
                    report.cached
                );
                true
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    "Failed to load types for {}: {} (transient, reset to retry)",
                    library, e
                );
                false
            }
            Err(e) => {
                warn!("Failed to load types for {}: {}", library, e);
                false
            }
        }
    }

    /// Load several libraries concurrently; failures stay isolated
    pub async fn load_libraries<S: AsRef<str>>(&self, libraries: &[S]) -> Vec<LibraryLoadResult> {
        join_all(libraries.iter().map(|library| async move {
            let library = library.as_ref();
            LibraryLoadResult {
                library: library.to_string(),
                success: self.load_library(library).await,
            }
        }))
        .await
    }

    /// Load the types of every allow-listed package `source` imports
    ///
    /// Packages load in batches of `batch_size`; batches run one after the
    /// other, libraries within a batch concurrently.
    pub async fn analyze_and_load_types(&self, source: &str) -> AnalysisReport {
        let mut report = AnalysisReport {
            referenced: extract::top_level_packages(source, &self.settings.builtins),
            ..AnalysisReport::default()
        };

        if self.settings.infer_components {
            report.inferred = self.register_inferred_components(source).await;
        }

        let pending: Vec<String> = report
            .referenced
            .iter()
            .filter(|name| self.is_allowed(name) && self.state(name) == LoadState::Unloaded)
            .cloned()
            .collect();

        for batch in pending.chunks(self.settings.batch_size) {
            debug!("Loading batch: {}", batch.join(", "));
            report.loads.extend(self.load_libraries(batch).await);
        }

        report
    }

    /// Return `library` to `unloaded` so the next load probes it again
    pub fn reset(&self, library: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(library);
        }
        self.walker.forget_package(library);
    }

    /// Return every library to `unloaded` and forget all visited files
    pub fn reset_all(&self) {
        if let Ok(mut states) = self.states.lock() {
            states.clear();
        }
        self.walker.reset();
    }

    /// Move `library` to `loading` if it is allowed and unloaded
    fn begin(&self, library: &str) -> bool {
        let Ok(mut states) = self.states.lock() else {
            return false;
        };
        if states.contains_key(library) {
            debug!("Types for {} already requested", library);
            return false;
        }
        if !self.is_allowed(library) {
            debug!("{} is not allow-listed", library);
            return false;
        }
        states.insert(library.to_string(), LoadState::Loading);
        true
    }

    fn set_state(&self, library: &str, state: LoadState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(library.to_string(), state);
        }
    }

    async fn register_inferred_components(&self, source: &str) -> Vec<String> {
        let mut published = Vec::new();
        for import in components::component_imports(source) {
            if !self.is_allowed(&import.package) {
                continue;
            }
            let path = components::inferred_path(self.registrar.virtual_root(), &import);
            let text = components::render_declaration(&import);
            if self.registrar.register(&path, &text).await {
                published.push(path);
            }
        }
        published
    }
}
