//! Persisted cache record

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// One cached declaration file, stored as JSON under its namespaced key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Declaration text exactly as fetched
    pub content: String,

    /// When the content was fetched (epoch milliseconds)
    #[serde(rename = "timestamp")]
    pub fetched_at_ms: i64,

    /// Upstream version the content belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Revalidation tag (the response ETag)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl CacheRecord {
    /// Create a record stamped with the current time
    pub fn new(content: String, etag: Option<String>, version: Option<String>) -> Self {
        Self {
            content,
            fetched_at_ms: now_ms(),
            version,
            etag,
        }
    }

    /// Age of the record relative to `now_ms`
    pub fn age(&self, now_ms: i64) -> Duration {
        Duration::milliseconds(now_ms.saturating_sub(self.fetched_at_ms))
    }

    /// Whether the record has outlived `max_age`
    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.age(now_ms()) >= max_age
    }
}

/// Current time in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_wire_names() {
        let record = CacheRecord {
            content: "export {};".to_string(),
            fetched_at_ms: 1_700_000_000_000,
            version: None,
            etag: Some("\"abc\"".to_string()),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"timestamp\":1700000000000"));
        assert!(json.contains("\"etag\""));
        assert!(!json.contains("version"));
    }

    #[test]
    fn fresh_record_not_expired() {
        let record = CacheRecord::new("x".to_string(), None, None);
        assert!(!record.is_expired(Duration::hours(24)));
    }

    #[test]
    fn old_record_expired() {
        let mut record = CacheRecord::new("x".to_string(), None, None);
        record.fetched_at_ms -= Duration::hours(25).num_milliseconds();
        assert!(record.is_expired(Duration::hours(24)));
    }
}
