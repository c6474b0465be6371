//! Error types for typeload
//!
//! All modules use `TypeLoadResult<T>` as their return type. Most of these
//! errors never reach the caller: cache and traversal failures are logged and
//! absorbed where they occur, so only configuration, CLI and top-level
//! entry-point failures surface.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for typeload operations
pub type TypeLoadResult<T> = Result<T, TypeLoadError>;

/// All errors that can occur in typeload
#[derive(Error, Debug)]
pub enum TypeLoadError {
    // Network errors
    #[error("Request to {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Storage errors
    #[error("Cache storage error for {key}: {reason}")]
    Storage { key: String, reason: String },

    #[error("Cache storage quota exceeded while writing {key}")]
    QuotaExceeded { key: String },

    // Loader errors
    #[error("Library is not in the allow-list: {0}")]
    NotAllowed(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TypeLoadError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a storage error
    pub fn storage(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Storage {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAllowed(_) => Some("Add the library to [loader] allowed in config.toml"),
            Self::QuotaExceeded { .. } => Some("Run: typeload cache clear"),
            Self::Transport { .. } => Some("Check network access to the registry base_url"),
            Self::ConfigInvalid { .. } => Some("Run: typeload config show"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypeLoadError::HttpStatus {
            url: "https://esm.sh/nope".to_string(),
            status: 404,
        };
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn error_hint() {
        let err = TypeLoadError::NotAllowed("left-pad".to_string());
        assert_eq!(
            err.hint(),
            Some("Add the library to [loader] allowed in config.toml")
        );
    }

    #[test]
    fn error_retryable() {
        assert!(TypeLoadError::transport("https://esm.sh", "connection reset").is_retryable());
        assert!(TypeLoadError::HttpStatus {
            url: String::new(),
            status: 503
        }
        .is_retryable());
        assert!(!TypeLoadError::HttpStatus {
            url: String::new(),
            status: 404
        }
        .is_retryable());
    }
}
