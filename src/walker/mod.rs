//! Declaration dependency graph walker
//!
//! Resolves a package's declaration entry point, then walks everything it
//! references: triple-slash references, relative and absolute imports, and
//! bare package imports (resolved as new entry points). Every URL and every
//! `package:<name>` marker is visited at most once per walker lifetime, which
//! both deduplicates network work and breaks cycles.
//!
//! The walk is iterative over an explicit stack. Children are pushed in
//! reverse so a file's references are followed before its imports, depth
//! first. Walks started concurrently share the visited set and may
//! interleave; registration is idempotent so the order does not matter.

pub mod parse;

use crate::cache::{PersistentTypeCache, SetOptions};
use crate::config::schema::RegistryConfig;
use crate::error::{TypeLoadError, TypeLoadResult};
use crate::fetch::{self, Transport};
use crate::registrar::Registrar;
use parse::{Reference, SpecifierKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Registry endpoints and naming used by the walker
#[derive(Debug, Clone)]
pub struct WalkerSettings {
    /// Package resolution base URL
    pub base_url: String,
    /// Header carrying the declaration entry point
    pub types_header: String,
    /// Query used when the header is absent
    pub fallback_query: String,
    /// Virtual module root
    pub virtual_root: String,
}

impl Default for WalkerSettings {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

impl WalkerSettings {
    /// Build settings from the `[registry]` config section
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            types_header: config.types_header.clone(),
            fallback_query: config.fallback_query.clone(),
            virtual_root: config.virtual_root.clone(),
        }
    }

    /// URL probed for a package's declaration location
    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, package)
    }

    /// Declaration URL used when the probe yields no hint
    pub fn fallback_url(&self, package: &str) -> String {
        format!("{}?{}", self.package_url(package), self.fallback_query)
    }
}

/// Outcome counters for one walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    /// Files downloaded
    pub fetched: usize,
    /// Files served from the persistent cache
    pub cached: usize,
    /// Files and packages skipped because they were already visited
    pub skipped: usize,
    /// Files or packages that could not be obtained
    pub failed: usize,
    /// Registrations that changed the language service
    pub registered: usize,
}

impl WalkReport {
    /// Files obtained either way
    pub fn files(&self) -> usize {
        self.fetched + self.cached
    }
}

/// Pending unit of traversal
#[derive(Debug)]
enum Work {
    Package(String),
    File { url: String, package: Option<String> },
}

/// Walks declaration graphs and feeds the registrar
pub struct DependencyWalker {
    transport: Arc<dyn Transport>,
    cache: Arc<PersistentTypeCache>,
    registrar: Arc<Registrar>,
    settings: WalkerSettings,
    visited: Mutex<HashSet<String>>,
    /// Entry URL each resolved package was walked from
    entries: Mutex<HashMap<String, String>>,
}

impl DependencyWalker {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<PersistentTypeCache>,
        registrar: Arc<Registrar>,
        settings: WalkerSettings,
    ) -> Self {
        Self {
            transport,
            cache,
            registrar,
            settings,
            visited: Mutex::new(HashSet::new()),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `package`'s entry point and walk its declaration graph
    ///
    /// Fails only when the entry file itself cannot be obtained; failures
    /// further down the graph are counted in the report and skipped.
    /// Calling this again for a visited package is a no-op.
    pub async fn fetch_entry(&self, package: &str) -> TypeLoadResult<WalkReport> {
        let mut report = WalkReport::default();
        let mut stack = Vec::new();

        let Some(entry_url) = self.resolve_entry(package, &mut report).await else {
            return Ok(report);
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(package.to_string(), entry_url.clone());
        }

        self.visit_file(&entry_url, Some(package), &mut stack, &mut report)
            .await?;
        self.drain(stack, &mut report).await;

        debug!(
            "Walked {}: {} fetched, {} cached, {} skipped, {} failed",
            package, report.fetched, report.cached, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Walk from a single declaration file; failures are skipped
    pub async fn process_file(&self, url: &str, package: Option<&str>) -> WalkReport {
        let mut report = WalkReport::default();
        let stack = vec![Work::File {
            url: url.to_string(),
            package: package.map(String::from),
        }];
        self.drain(stack, &mut report).await;
        report
    }

    /// Whether `marker` (a normalized URL or `package:<name>`) was visited
    pub fn is_visited(&self, marker: &str) -> bool {
        self.visited
            .lock()
            .map(|visited| visited.contains(marker))
            .unwrap_or(false)
    }

    /// Forget every visited marker so the next walk fetches again
    pub fn reset(&self) {
        if let Ok(mut visited) = self.visited.lock() {
            visited.clear();
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Forget `package` and its entry file so it can be resolved again
    ///
    /// Files reached through the entry stay visited.
    pub fn forget_package(&self, package: &str) {
        let entry = self
            .entries
            .lock()
            .ok()
            .and_then(|mut entries| entries.remove(package));
        if let Ok(mut visited) = self.visited.lock() {
            visited.remove(&format!("package:{}", package));
            if let Some(url) = entry {
                visited.remove(&fetch::normalize_declaration_url(&url));
            }
        }
    }

    /// Record `marker`; returns false if it was already present
    fn mark_visited(&self, marker: &str) -> bool {
        match self.visited.lock() {
            Ok(mut visited) => visited.insert(marker.to_string()),
            Err(_) => false,
        }
    }

    async fn drain(&self, mut stack: Vec<Work>, report: &mut WalkReport) {
        while let Some(work) = stack.pop() {
            match work {
                Work::Package(package) => {
                    if let Some(url) = self.resolve_entry(&package, report).await {
                        stack.push(Work::File {
                            url,
                            package: Some(package),
                        });
                    }
                }
                Work::File { url, package } => {
                    if let Err(e) = self
                        .visit_file(&url, package.as_deref(), &mut stack, report)
                        .await
                    {
                        debug!("Skipping {}: {}", url, e);
                    }
                }
            }
        }
    }

    /// Find the entry declaration URL of `package`, marking it visited
    ///
    /// Returns `None` if the package was already visited.
    async fn resolve_entry(&self, package: &str, report: &mut WalkReport) -> Option<String> {
        if !self.mark_visited(&format!("package:{}", package)) {
            debug!("Package {} already visited", package);
            report.skipped += 1;
            return None;
        }

        let package_url = self.settings.package_url(package);
        match self.transport.head(&package_url).await {
            Ok(response) if response.is_success() => {
                if let Some(hint) = response.header(&self.settings.types_header) {
                    match fetch::resolve(&package_url, hint) {
                        Ok(url) => {
                            debug!("Resolved {} types to {}", package, url);
                            return Some(url);
                        }
                        Err(e) => warn!("Ignoring unusable types hint for {}: {}", package, e),
                    }
                }
            }
            Ok(response) => debug!(
                "Probe for {} returned HTTP {}, using fallback",
                package, response.status
            ),
            Err(e) => debug!("Probe for {} failed, using fallback: {}", package, e),
        }

        Some(self.settings.fallback_url(package))
    }

    /// Obtain, register and expand one file
    async fn visit_file(
        &self,
        url: &str,
        package: Option<&str>,
        stack: &mut Vec<Work>,
        report: &mut WalkReport,
    ) -> TypeLoadResult<()> {
        let url = fetch::normalize_declaration_url(url);
        if !self.mark_visited(&url) {
            report.skipped += 1;
            return Ok(());
        }

        let content = match self.obtain(&url, report).await {
            Ok(content) => content,
            Err(e) => {
                report.failed += 1;
                return Err(e);
            }
        };

        let published = match package {
            Some(package) => self.registrar.register_package(package, &content).await,
            None => {
                let path = fetch::virtual_path_for(
                    &url,
                    &self.settings.base_url,
                    &self.settings.virtual_root,
                );
                self.registrar.register(&path, &content).await
            }
        };
        if published {
            report.registered += 1;
        }

        let children = self.dependencies(&url, &content);
        stack.extend(children.into_iter().rev());
        Ok(())
    }

    /// Cache first, then network (caching the result)
    async fn obtain(&self, url: &str, report: &mut WalkReport) -> TypeLoadResult<String> {
        if let Some(content) = self.cache.get(url).await {
            report.cached += 1;
            return Ok(content);
        }

        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(TypeLoadError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let options = SetOptions {
            etag: response.etag().map(String::from),
            version: fetch::version_from_url(url),
        };
        self.cache.set(url, &response.body, options).await;
        report.fetched += 1;
        Ok(response.body)
    }

    /// Children of a file: references first, then imports
    fn dependencies(&self, url: &str, content: &str) -> Vec<Work> {
        let mut children = Vec::new();

        for reference in parse::references(content) {
            match reference {
                Reference::Path(path) => self.push_file(&mut children, url, &path),
                Reference::Types(package) => children.push(Work::Package(package)),
            }
        }

        for specifier in parse::module_specifiers(content) {
            match parse::classify(&specifier) {
                SpecifierKind::Relative | SpecifierKind::Url => {
                    self.push_file(&mut children, url, &specifier)
                }
                SpecifierKind::Package => children.push(Work::Package(specifier)),
                SpecifierKind::Ignored => debug!("Not following {} from {}", specifier, url),
            }
        }

        children
    }

    fn push_file(&self, children: &mut Vec<Work>, base: &str, specifier: &str) {
        match fetch::resolve(base, specifier) {
            Ok(url) => children.push(Work::File { url, package: None }),
            Err(e) => debug!("Cannot resolve {} from {}: {}", specifier, base, e),
        }
    }
}
