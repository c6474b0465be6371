//! Cache key derivation
//!
//! Keys are derived from the source URL by replacing every non-alphanumeric
//! character with `_` and prefixing the cache namespace. The transform is
//! deterministic but not injective: `https://a.io/x-y` and `https://a.io/x_y`
//! share a key. Such collisions are a known limitation; the stored record
//! does not carry its URL, so a colliding read returns the other URL's text.

/// Sanitize a URL into the key-safe alphabet `[A-Za-z0-9_]`
pub fn sanitize(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Build the namespaced cache key for a URL
pub fn derive_key(namespace: &str, url: &str) -> String {
    format!("{}{}", namespace, sanitize(url))
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Convert MB to bytes
pub fn mb_to_bytes(mb: u32) -> u64 {
    u64::from(mb) * 1024 * 1024
}
