//! Durable declaration cache with expiry, ETag revalidation and
//! size-bounded eviction
//!
//! Nothing in here fails the caller: undecodable records are dropped and
//! reported as misses, storage write failures are logged and ignored, and a
//! revalidation probe that cannot complete keeps the stored entry.

use crate::cache::key::{derive_key, format_bytes, mb_to_bytes};
use crate::cache::record::{now_ms, CacheRecord};
use crate::cache::store::KvStore;
use crate::config::schema::CacheConfig;
use crate::fetch::Transport;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tunables for the persistent cache
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// When false, `get` always misses and `set` is a no-op
    pub enabled: bool,
    /// Key prefix owned by this cache
    pub namespace: String,
    /// Entry lifetime
    pub max_age: Duration,
    /// Total stored bytes allowed before eviction
    pub max_size_bytes: u64,
    /// Share of the oldest entries dropped per eviction
    pub eviction_fraction: f64,
    /// Probe tagged entries with HEAD before serving them
    pub revalidate: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl CacheSettings {
    /// Build settings from the `[cache]` config section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            namespace: config.namespace.clone(),
            max_age: Duration::hours(i64::from(config.max_age_hours)),
            max_size_bytes: mb_to_bytes(config.max_size_mb),
            eviction_fraction: config.eviction_fraction.clamp(0.0, 1.0),
            revalidate: config.revalidate,
        }
    }
}

/// Options attached to a cache write
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Revalidation tag (ETag) from the response
    pub etag: Option<String>,
    /// Upstream version of the content
    pub version: Option<String>,
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries in this namespace
    pub count: usize,
    /// Total stored bytes
    pub total_size: u64,
    /// Total stored size, human-readable
    pub total_size_formatted: String,
    /// Hit percentage over this process lifetime (0.0 - 100.0)
    pub hit_rate: f64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Listing row for one stored entry
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub size: u64,
    pub fetched_at: DateTime<Utc>,
    pub etag: Option<String>,
    pub version: Option<String>,
}

/// Key, stored size and timestamp of a decodable entry
struct ScannedEntry {
    key: String,
    size: u64,
    record: CacheRecord,
}

/// Persistent declaration cache keyed by source URL
pub struct PersistentTypeCache {
    store: Arc<dyn KvStore>,
    revalidator: Option<Arc<dyn Transport>>,
    settings: CacheSettings,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PersistentTypeCache {
    /// Create a cache over `store`; `revalidator` answers HEAD probes
    pub fn new(
        store: Arc<dyn KvStore>,
        revalidator: Option<Arc<dyn Transport>>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            revalidator,
            settings,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Settings in effect
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Namespaced storage key for `url`
    pub fn key_for(&self, url: &str) -> String {
        derive_key(&self.settings.namespace, url)
    }

    /// Return cached content for `url` if present, fresh and still valid
    pub async fn get(&self, url: &str) -> Option<String> {
        if !self.settings.enabled {
            return None;
        }

        let key = self.key_for(url);
        let Some(record) = self.load(&key).await else {
            return self.miss();
        };

        if record.is_expired(self.settings.max_age) {
            debug!("Cache entry for {} expired", url);
            self.discard(&key).await;
            return self.miss();
        }

        if let Some(stored_tag) = record.etag.as_deref() {
            if !self.still_valid(url, stored_tag).await {
                debug!("Cache entry for {} invalidated by ETag change", url);
                self.discard(&key).await;
                return self.miss();
            }
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache hit for {}", url);
        Some(record.content)
    }

    /// Store `content` for `url`, evicting old entries first if over budget
    pub async fn set(&self, url: &str, content: &str, options: SetOptions) {
        if !self.settings.enabled {
            return;
        }

        let key = self.key_for(url);
        let record = CacheRecord::new(content.to_string(), options.etag, options.version);
        let serialized = match serde_json::to_string(&record) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to encode cache record for {}: {}", url, e);
                return;
            }
        };

        self.ensure_budget(&key, serialized.len() as u64).await;

        if let Err(e) = self.store.set(&key, serialized).await {
            warn!("Failed to write cache entry for {}: {}", url, e);
        }
    }

    /// Whether a decodable entry exists for `url` (no expiry or ETag check)
    pub async fn contains(&self, url: &str) -> bool {
        matches!(self.store.get(&self.key_for(url)).await, Ok(Some(_)))
    }

    /// Remove the entry for `url`
    pub async fn remove(&self, url: &str) {
        let key = self.key_for(url);
        self.discard(&key).await;
    }

    /// Remove every entry in this cache's namespace, returning how many
    pub async fn clear(&self) -> usize {
        let mut removed = 0;
        for key in self.namespace_keys().await {
            match self.store.remove(&key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove cache entry {}: {}", key, e),
            }
        }
        debug!("Cleared {} cache entries", removed);
        removed
    }

    /// Snapshot of size and hit/miss counters
    pub async fn stats(&self) -> CacheStats {
        let entries = self.scan().await;
        let total_size: u64 = entries.iter().map(|e| e.size).sum();
        let hit_count = self.hits.load(Ordering::Relaxed);
        let miss_count = self.misses.load(Ordering::Relaxed);
        let lookups = hit_count + miss_count;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            (hit_count as f64 / lookups as f64) * 100.0
        };

        CacheStats {
            count: entries.len(),
            total_size,
            total_size_formatted: format_bytes(total_size),
            hit_rate,
            hit_count,
            miss_count,
        }
    }

    /// List stored entries, oldest first
    pub async fn entries(&self) -> Vec<CacheEntryInfo> {
        let mut entries = self.scan().await;
        entries.sort_by_key(|e| e.record.fetched_at_ms);
        entries
            .into_iter()
            .map(|e| CacheEntryInfo {
                key: e.key,
                size: e.size,
                fetched_at: DateTime::from_timestamp_millis(e.record.fetched_at_ms)
                    .unwrap_or_default(),
                etag: e.record.etag,
                version: e.record.version,
            })
            .collect()
    }

    fn miss(&self) -> Option<String> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Read and decode one record; undecodable records are deleted
    async fn load(&self, key: &str) -> Option<CacheRecord> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheRecord>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Dropping malformed cache entry {}: {}", key, e);
                self.discard(key).await;
                None
            }
        }
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!("Failed to remove cache entry {}: {}", key, e);
        }
    }

    /// Compare the stored tag with the current upstream ETag (fail-open)
    async fn still_valid(&self, url: &str, stored_tag: &str) -> bool {
        if !self.settings.revalidate {
            return true;
        }
        let Some(transport) = &self.revalidator else {
            return true;
        };

        match transport.head(url).await {
            Ok(response) if response.is_success() => match response.etag() {
                Some(current) => current == stored_tag,
                None => true,
            },
            Ok(response) => {
                debug!(
                    "Revalidation of {} returned HTTP {}, keeping entry",
                    url, response.status
                );
                true
            }
            Err(e) => {
                debug!("Revalidation of {} failed, keeping entry: {}", url, e);
                true
            }
        }
    }

    async fn namespace_keys(&self) -> Vec<String> {
        match self.store.keys().await {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.settings.namespace))
                .collect(),
            Err(e) => {
                warn!("Failed to list cache entries: {}", e);
                Vec::new()
            }
        }
    }

    /// Decode every entry in the namespace, dropping malformed ones
    async fn scan(&self) -> Vec<ScannedEntry> {
        let mut entries = Vec::new();
        for key in self.namespace_keys().await {
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read cache entry {}: {}", key, e);
                    continue;
                }
            };
            match serde_json::from_str::<CacheRecord>(&raw) {
                Ok(record) => entries.push(ScannedEntry {
                    size: raw.len() as u64,
                    key,
                    record,
                }),
                Err(_) => {
                    debug!("Dropping malformed cache entry {}", key);
                    self.discard(&key).await;
                }
            }
        }
        entries
    }

    /// Evict the oldest share of entries if writing `incoming` bytes under
    /// `key` would cross the size budget
    async fn ensure_budget(&self, key: &str, incoming: u64) {
        let entries = self.scan().await;
        let current: u64 = entries
            .iter()
            .filter(|e| e.key != key)
            .map(|e| e.size)
            .sum();

        if current + incoming <= self.settings.max_size_bytes {
            return;
        }

        let mut by_age: Vec<ScannedEntry> = entries;
        by_age.sort_by_key(|e| e.record.fetched_at_ms);
        let evict = eviction_count(by_age.len(), self.settings.eviction_fraction);

        debug!(
            "Cache over budget ({} + {} > {}), evicting {} of {} entries",
            format_bytes(current),
            format_bytes(incoming),
            format_bytes(self.settings.max_size_bytes),
            evict,
            by_age.len()
        );

        for entry in by_age.into_iter().take(evict) {
            self.discard(&entry.key).await;
        }
    }
}

/// Number of entries an eviction pass removes (at least one when any exist)
fn eviction_count(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    ((len as f64 * fraction).ceil() as usize).clamp(1, len)
}

/// Age of a stored record in whole seconds, for display
pub fn age_secs(fetched_at: DateTime<Utc>) -> i64 {
    (now_ms() - fetched_at.timestamp_millis()) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::fetch::testing::{Call, ScriptedTransport};
    use crate::fetch::HttpResponse;

    const URL: &str = "https://esm.sh/v135/lodash@4.17.21/index.d.ts";

    fn cache_over(store: Arc<MemoryStore>) -> PersistentTypeCache {
        PersistentTypeCache::new(store, None, CacheSettings::default())
    }

    fn raw_record(content: &str, fetched_at_ms: i64, etag: Option<&str>) -> String {
        serde_json::to_string(&CacheRecord {
            content: content.to_string(),
            fetched_at_ms,
            version: None,
            etag: etag.map(String::from),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = cache_over(Arc::new(MemoryStore::new()));

        cache.set(URL, "X", SetOptions::default()).await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("X"));

        let stats = cache.stats().await;
        assert_eq!(stats.count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.hit_rate, 100.0);
    }

    #[tokio::test]
    async fn missing_entry_counts_miss() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        assert!(cache.get(URL).await.is_none());
        assert_eq!(cache.stats().await.miss_count, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_absent_and_removed() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone());
        let key = cache.key_for(URL);
        let stale = now_ms() - Duration::hours(25).num_milliseconds();
        store.set(&key, raw_record("old", stale, None)).await.unwrap();

        assert!(cache.get(URL).await.is_none());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_entry_is_miss_and_deleted() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone());
        let key = cache.key_for(URL);
        store.set(&key, "{not json".to_string()).await.unwrap();

        assert!(cache.get(URL).await.is_none());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn changed_etag_invalidates() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(
            ScriptedTransport::new().head(URL, HttpResponse::new(200, "").with_header("ETag", "\"v2\"")),
        );
        let cache = PersistentTypeCache::new(store.clone(), Some(transport.clone()), CacheSettings::default());

        cache
            .set(URL, "v1 text", SetOptions { etag: Some("\"v1\"".to_string()), version: None })
            .await;

        assert!(cache.get(URL).await.is_none());
        assert_eq!(transport.count(Call::Head, URL), 1);
        assert!(!cache.contains(URL).await);
    }

    #[tokio::test]
    async fn matching_etag_keeps_entry() {
        let transport = Arc::new(
            ScriptedTransport::new().head(URL, HttpResponse::new(200, "").with_header("etag", "\"v1\"")),
        );
        let cache = PersistentTypeCache::new(
            Arc::new(MemoryStore::new()),
            Some(transport),
            CacheSettings::default(),
        );

        cache
            .set(URL, "v1 text", SetOptions { etag: Some("\"v1\"".to_string()), version: None })
            .await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("v1 text"));
    }

    #[tokio::test]
    async fn failed_revalidation_is_fail_open() {
        // No HEAD route: the probe errors out
        let transport = Arc::new(ScriptedTransport::new());
        let cache = PersistentTypeCache::new(
            Arc::new(MemoryStore::new()),
            Some(transport.clone()),
            CacheSettings::default(),
        );

        cache
            .set(URL, "offline", SetOptions { etag: Some("\"v1\"".to_string()), version: None })
            .await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("offline"));
        assert_eq!(transport.count(Call::Head, URL), 1);
    }

    #[tokio::test]
    async fn untagged_entry_skips_probe() {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = PersistentTypeCache::new(
            Arc::new(MemoryStore::new()),
            Some(transport.clone()),
            CacheSettings::default(),
        );

        cache.set(URL, "plain", SetOptions::default()).await;
        assert!(cache.get(URL).await.is_some());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn over_budget_write_evicts_oldest_thirty_percent() {
        let store = Arc::new(MemoryStore::new());
        let settings = CacheSettings {
            max_size_bytes: 2_000,
            ..CacheSettings::default()
        };
        let cache = PersistentTypeCache::new(store.clone(), None, settings);

        let body = "x".repeat(150);
        let base = now_ms() - 10_000;
        for i in 0..10 {
            let key = cache.key_for(&format!("https://esm.sh/f{}.d.ts", i));
            store
                .set(&key, raw_record(&body, base + i as i64, None))
                .await
                .unwrap();
        }

        cache
            .set("https://esm.sh/new.d.ts", &body, SetOptions::default())
            .await;

        for i in 0..3 {
            let key = cache.key_for(&format!("https://esm.sh/f{}.d.ts", i));
            assert!(store.get(&key).await.unwrap().is_none(), "f{} should be evicted", i);
        }
        for i in 3..10 {
            let key = cache.key_for(&format!("https://esm.sh/f{}.d.ts", i));
            assert!(store.get(&key).await.unwrap().is_some(), "f{} should survive", i);
        }
        assert!(cache.contains("https://esm.sh/new.d.ts").await);
    }

    #[tokio::test]
    async fn under_budget_write_evicts_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone());
        for i in 0..5 {
            cache
                .set(&format!("https://esm.sh/f{}.d.ts", i), "small", SetOptions::default())
                .await;
        }
        assert_eq!(cache.stats().await.count, 5);
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::with_quota(64));
        let cache = cache_over(store);

        cache.set(URL, &"y".repeat(1_000), SetOptions::default()).await;
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn clear_only_touches_namespace() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone());
        store.set("foreign-key", "keep me".to_string()).await.unwrap();

        cache.set(URL, "a", SetOptions::default()).await;
        cache.set("https://esm.sh/b.d.ts", "b", SetOptions::default()).await;

        assert_eq!(cache.clear().await, 2);
        assert_eq!(cache.stats().await.count, 0);
        assert_eq!(
            store.get("foreign-key").await.unwrap().as_deref(),
            Some("keep me")
        );
    }

    #[tokio::test]
    async fn remove_drops_entry() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        cache.set(URL, "a", SetOptions::default()).await;
        cache.remove(URL).await;
        assert!(!cache.contains(URL).await);
    }

    #[tokio::test]
    async fn disabled_cache_never_stores() {
        let settings = CacheSettings {
            enabled: false,
            ..CacheSettings::default()
        };
        let cache = PersistentTypeCache::new(Arc::new(MemoryStore::new()), None, settings);
        cache.set(URL, "a", SetOptions::default()).await;
        assert!(cache.get(URL).await.is_none());
        assert_eq!(cache.stats().await.count, 0);
    }

    #[tokio::test]
    async fn entries_list_oldest_first() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone());
        let now = now_ms();
        store
            .set(&cache.key_for("https://esm.sh/new.d.ts"), raw_record("n", now, Some("\"e\"")))
            .await
            .unwrap();
        store
            .set(&cache.key_for("https://esm.sh/old.d.ts"), raw_record("o", now - 5_000, None))
            .await
            .unwrap();

        let entries = cache.entries().await;
        assert_eq!(entries.len(), 2);
        assert!(entries[0].key.ends_with("old_d_ts"));
        assert_eq!(entries[1].etag.as_deref(), Some("\"e\""));
    }

    #[test]
    fn eviction_count_rounds_up() {
        assert_eq!(eviction_count(0, 0.3), 0);
        assert_eq!(eviction_count(1, 0.3), 1);
        assert_eq!(eviction_count(10, 0.3), 3);
        assert_eq!(eviction_count(11, 0.3), 4);
        assert_eq!(eviction_count(4, 1.0), 4);
    }
}
