//! Persistent cache for fetched declaration files
//!
//! Records are JSON documents stored under a namespaced key derived from the
//! source URL. Every record carries its fetch time; records older than the
//! configured lifetime are dropped on read.
//!
//! # Lookup order
//!
//! | Step | Outcome |
//! |------|---------|
//! | No record / undecodable | Miss (undecodable record deleted) |
//! | Expired | Miss, record deleted |
//! | ETag present, HEAD reports another ETag | Miss, record deleted |
//! | ETag present, HEAD fails | Hit (fail-open) |
//! | Otherwise | Hit |
//!
//! Writes check the namespace's total size first and drop the oldest share
//! of entries (by fetch time, not access time) when the write would cross
//! the budget.

pub mod key;
pub mod persistent;
pub mod record;
pub mod store;

pub use key::{derive_key, format_bytes};
pub use persistent::{CacheEntryInfo, CacheSettings, CacheStats, PersistentTypeCache, SetOptions};
pub use record::CacheRecord;
pub use store::{FileStore, KvStore, MemoryStore};
