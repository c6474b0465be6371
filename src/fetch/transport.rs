//! HTTP transport abstraction
//!
//! The walker and the cache only ever issue two kinds of requests: a HEAD
//! probe (entry-point resolution, ETag revalidation) and a GET for
//! declaration text. `Transport` captures exactly that so tests can swap in a
//! scripted fake.

use crate::error::{TypeLoadError, TypeLoadResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Minimal HTTP response as seen by the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,

    /// Response headers, names lower-cased
    pub headers: HashMap<String, String>,

    /// Response body (empty for HEAD)
    pub body: String,
}

impl HttpResponse {
    /// Build a response with the given status and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header (name is lower-cased)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `ETag` header, if any
    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }
}

/// Abstract HTTP interface used for resolution, fetch and revalidation
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a HEAD request
    async fn head(&self, url: &str) -> TypeLoadResult<HttpResponse>;

    /// Issue a GET request and read the body as text
    async fn get(&self, url: &str) -> TypeLoadResult<HttpResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Head,
    Get,
}

/// `ureq`-backed transport; blocking calls run on the tokio blocking pool
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport with an optional global request timeout
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .user_agent(concat!("typeload/", env!("CARGO_PKG_VERSION")))
            .build()
            .into();
        Self { agent }
    }

    async fn send(&self, method: Method, url: &str) -> TypeLoadResult<HttpResponse> {
        let agent = self.agent.clone();
        let owned_url = url.to_string();

        tokio::task::spawn_blocking(move || send_blocking(&agent, method, &owned_url))
            .await
            .map_err(|e| TypeLoadError::Internal(format!("request task failed: {}", e)))?
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

fn send_blocking(agent: &ureq::Agent, method: Method, url: &str) -> TypeLoadResult<HttpResponse> {
    debug!("{:?} {}", method, url);

    let result = match method {
        Method::Head => agent.head(url).call(),
        Method::Get => agent.get(url).call(),
    };
    let mut response = result.map_err(|e| TypeLoadError::transport(url, e))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    let body = match method {
        Method::Head => String::new(),
        Method::Get => response
            .body_mut()
            .read_to_string()
            .map_err(|e| TypeLoadError::transport(url, e))?,
    };

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

#[async_trait]
impl Transport for UreqTransport {
    async fn head(&self, url: &str) -> TypeLoadResult<HttpResponse> {
        self.send(Method::Head, url).await
    }

    async fn get(&self, url: &str) -> TypeLoadResult<HttpResponse> {
        self.send(Method::Get, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(200, "")
            .with_header("X-TypeScript-Types", "/v135/lodash/index.d.ts")
            .with_header("ETag", "\"v1\"");

        assert_eq!(
            response.header("x-typescript-types"),
            Some("/v135/lodash/index.d.ts")
        );
        assert_eq!(response.etag(), Some("\"v1\""));
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
    }
}
