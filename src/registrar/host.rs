//! Library hosts: the consumer side of registration

use crate::error::{TypeLoadError, TypeLoadResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// The consuming language service's extra-library API
#[async_trait]
pub trait LibraryHost: Send + Sync {
    /// Content currently registered at `path`
    async fn existing(&self, path: &str) -> TypeLoadResult<Option<String>>;

    /// Register `content` at `path`, returning what it replaced
    async fn add(&self, path: &str, content: &str) -> TypeLoadResult<Option<String>>;

    /// Drop every registration
    async fn clear(&self) -> TypeLoadResult<()>;
}

/// Registrations held in memory
#[derive(Default)]
pub struct MemoryLibraryHost {
    libs: Mutex<BTreeMap<String, String>>,
    publishes: AtomicUsize,
}

impl MemoryLibraryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `add` calls that reached the host
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::Relaxed)
    }

    /// Registered virtual paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.libs
            .lock()
            .map(|libs| libs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content registered at `path`
    pub fn content(&self, path: &str) -> Option<String> {
        self.libs
            .lock()
            .ok()
            .and_then(|libs| libs.get(path).cloned())
    }

    fn lock(&self) -> TypeLoadResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.libs
            .lock()
            .map_err(|_| TypeLoadError::Internal("library host lock poisoned".to_string()))
    }
}

#[async_trait]
impl LibraryHost for MemoryLibraryHost {
    async fn existing(&self, path: &str) -> TypeLoadResult<Option<String>> {
        Ok(self.lock()?.get(path).cloned())
    }

    async fn add(&self, path: &str, content: &str) -> TypeLoadResult<Option<String>> {
        self.publishes.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock()?.insert(path.to_string(), content.to_string()))
    }

    async fn clear(&self) -> TypeLoadResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Manifest of files written below the root, one relative path per line
pub const MANIFEST_FILE: &str = ".typeload-files";

/// Materializes virtual paths as files under a root directory
///
/// `file:///node_modules/lodash/index.d.ts` lands at
/// `<root>/node_modules/lodash/index.d.ts`, which lets `tsc` or an editor
/// pick the declarations up through `typeRoots`/`paths`.
///
/// Every written path is appended to [`MANIFEST_FILE`] in the root, and
/// `clear` removes only those files. Anything else in the root is left alone,
/// since it is usually a user's project directory.
pub struct DirectoryLibraryHost {
    root: PathBuf,
}

impl DirectoryLibraryHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    async fn record(&self, relative: &Path) -> TypeLoadResult<()> {
        let manifest = self.manifest_path();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&manifest)
            .await
            .map_err(|e| TypeLoadError::io(format!("opening {}", manifest.display()), e))?;
        file.write_all(format!("{}\n", relative.display()).as_bytes())
            .await
            .map_err(|e| TypeLoadError::io(format!("writing {}", manifest.display()), e))?;
        file.flush()
            .await
            .map_err(|e| TypeLoadError::io(format!("writing {}", manifest.display()), e))
    }

    /// Relative paths listed in the manifest, deduplicated
    async fn recorded(&self) -> TypeLoadResult<BTreeSet<PathBuf>> {
        let manifest = self.manifest_path();
        let text = match fs::read_to_string(&manifest).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => {
                return Err(TypeLoadError::io(
                    format!("reading {}", manifest.display()),
                    e,
                ))
            }
        };
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(PathBuf::from)
            .filter(|path| is_contained(path))
            .collect())
    }

    /// Remove now-empty directories from `dir` up to (not including) the root
    async fn prune_empty(&self, mut dir: Option<&Path>) {
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            dir = current.parent();
        }
    }

    /// Map a virtual path onto the root, rejecting escapes
    pub fn file_path(&self, virtual_path: &str) -> TypeLoadResult<PathBuf> {
        let relative = virtual_path
            .strip_prefix("file:///")
            .unwrap_or(virtual_path)
            .trim_start_matches('/');

        let relative = Path::new(relative);
        if !is_contained(relative) || relative == Path::new(MANIFEST_FILE) {
            return Err(TypeLoadError::User(format!(
                "virtual path escapes output directory: {}",
                virtual_path
            )));
        }

        Ok(self.root.join(relative))
    }
}

/// Non-empty and made only of normal components
fn is_contained(relative: &Path) -> bool {
    !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl LibraryHost for DirectoryLibraryHost {
    async fn existing(&self, path: &str) -> TypeLoadResult<Option<String>> {
        let file = self.file_path(path)?;
        match fs::read_to_string(&file).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TypeLoadError::io(format!("reading {}", file.display()), e)),
        }
    }

    async fn add(&self, path: &str, content: &str) -> TypeLoadResult<Option<String>> {
        let previous = self.existing(path).await?;
        let file = self.file_path(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TypeLoadError::io(format!("creating {}", parent.display()), e))?;
        }
        fs::write(&file, content)
            .await
            .map_err(|e| TypeLoadError::io(format!("writing {}", file.display()), e))?;
        if previous.is_none() {
            if let Ok(relative) = file.strip_prefix(&self.root) {
                self.record(relative).await?;
            }
        }
        Ok(previous)
    }

    async fn clear(&self) -> TypeLoadResult<()> {
        for relative in self.recorded().await? {
            let file = self.root.join(&relative);
            match fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(TypeLoadError::io(format!("removing {}", file.display()), e))
                }
            }
            self.prune_empty(file.parent()).await;
        }

        match fs::remove_file(self.manifest_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TypeLoadError::io("removing output manifest", e)),
        }
    }
}
