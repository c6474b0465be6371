//! Publishes fetched declaration text into the language service
//!
//! Registration is content-deduplicated: publishing the same text at the
//! same virtual path twice reaches the host once.

pub mod host;

pub use host::{DirectoryLibraryHost, LibraryHost, MemoryLibraryHost};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Adapter between the walker and a `LibraryHost`
pub struct Registrar {
    host: Arc<dyn LibraryHost>,
    virtual_root: String,
    published: AtomicUsize,
}

impl Registrar {
    /// Create a registrar publishing under `virtual_root`
    pub fn new(host: Arc<dyn LibraryHost>, virtual_root: impl Into<String>) -> Self {
        Self {
            host,
            virtual_root: virtual_root.into(),
            published: AtomicUsize::new(0),
        }
    }

    /// Virtual root all paths are published under
    pub fn virtual_root(&self) -> &str {
        &self.virtual_root
    }

    /// Canonical entry path of a package
    pub fn entry_path(&self, package: &str) -> String {
        format!("{}{}/index.d.ts", self.virtual_root, package)
    }

    /// Secondary `@types` path of a package
    pub fn types_path(&self, package: &str) -> String {
        format!("{}@types/{}/index.d.ts", self.virtual_root, package)
    }

    /// Publish `content` at `path` unless identical content is already there
    ///
    /// Returns whether the host was updated. Host failures are logged.
    pub async fn register(&self, path: &str, content: &str) -> bool {
        match self.host.existing(path).await {
            Ok(Some(existing)) if existing == content => {
                debug!("Skipping unchanged registration {}", path);
                return false;
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to query registration {}: {}", path, e),
        }

        match self.host.add(path, content).await {
            Ok(previous) => {
                if previous.is_some() {
                    debug!("Replaced registration {}", path);
                } else {
                    debug!("Registered {}", path);
                }
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!("Failed to register {}: {}", path, e);
                false
            }
        }
    }

    /// Publish a package entry, mirrored under `@types` for plain packages
    pub async fn register_package(&self, package: &str, content: &str) -> bool {
        let published = self.register(&self.entry_path(package), content).await;
        if mirrors_to_types(package) {
            self.register(&self.types_path(package), content).await;
        }
        published
    }

    /// Number of publishes that reached the host
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }

    /// Drop every registration (cache-clear path only)
    pub async fn reset(&self) {
        if let Err(e) = self.host.clear().await {
            warn!("Failed to reset registrations: {}", e);
        }
    }
}

/// Only unscoped, top-level packages get an `@types` mirror
fn mirrors_to_types(package: &str) -> bool {
    !package.starts_with('@') && !package.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registrar() -> (Registrar, Arc<MemoryLibraryHost>) {
        let host = Arc::new(MemoryLibraryHost::new());
        (Registrar::new(host.clone(), "file:///node_modules/"), host)
    }

    #[tokio::test]
    async fn identical_content_registers_once() {
        let (registrar, host) = registrar();

        assert!(registrar.register("file:///a.d.ts", "same").await);
        assert!(!registrar.register("file:///a.d.ts", "same").await);

        assert_eq!(host.publish_count(), 1);
        assert_eq!(host.paths(), vec!["file:///a.d.ts".to_string()]);
    }

    #[tokio::test]
    async fn differing_content_replaces() {
        let (registrar, host) = registrar();

        registrar.register("file:///a.d.ts", "v1").await;
        assert!(registrar.register("file:///a.d.ts", "v2").await);

        assert_eq!(host.content("file:///a.d.ts").as_deref(), Some("v2"));
        assert_eq!(registrar.published_count(), 2);
    }

    #[tokio::test]
    async fn plain_package_mirrors_to_types() {
        let (registrar, host) = registrar();
        registrar.register_package("lodash", "declare const _: any;").await;

        assert_eq!(
            host.paths(),
            vec![
                "file:///node_modules/@types/lodash/index.d.ts".to_string(),
                "file:///node_modules/lodash/index.d.ts".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn scoped_and_deep_packages_do_not_mirror() {
        let (registrar, host) = registrar();
        registrar.register_package("@vapor-ui/core", "x").await;
        registrar.register_package("lodash/fp", "y").await;

        assert_eq!(host.paths().len(), 2);
        assert!(host
            .paths()
            .iter()
            .all(|p| !p.contains("@types")));
    }

    #[tokio::test]
    async fn reset_clears_host() {
        let (registrar, host) = registrar();
        registrar.register("file:///a.d.ts", "x").await;
        registrar.reset().await;
        assert!(host.paths().is_empty());
    }
}
