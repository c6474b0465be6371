//! Scripted transport for unit tests

use super::transport::{HttpResponse, Transport};
use crate::error::{TypeLoadError, TypeLoadResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Request method recorded by the scripted transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Head,
    Get,
}

/// Transport answering from a fixed route table and recording every request
///
/// Unrouted URLs fail with a transport error, which models an unreachable
/// host.
#[derive(Default)]
pub struct ScriptedTransport {
    heads: HashMap<String, HttpResponse>,
    gets: HashMap<String, HttpResponse>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(Call, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer HEAD `url` with `response`
    pub fn head(mut self, url: &str, response: HttpResponse) -> Self {
        self.heads.insert(url.to_string(), response);
        self
    }

    /// Answer GET `url` with a 200 carrying `body`
    pub fn file(mut self, url: &str, body: &str) -> Self {
        self.gets
            .insert(url.to_string(), HttpResponse::new(200, body));
        self
    }

    /// Answer GET `url` with `response`
    pub fn get(mut self, url: &str, response: HttpResponse) -> Self {
        self.gets.insert(url.to_string(), response);
        self
    }

    /// Sleep before answering, so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request issued so far
    pub fn calls(&self) -> Vec<(Call, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests of `method` to `url`
    pub fn count(&self, method: Call, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, u)| *m == method && u == url)
            .count()
    }

    /// Highest number of requests that were outstanding at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        method: Call,
        url: &str,
        routes: &HashMap<String, HttpResponse>,
    ) -> TypeLoadResult<HttpResponse> {
        self.calls.lock().unwrap().push((method, url.to_string()));
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        routes
            .get(url)
            .cloned()
            .ok_or_else(|| TypeLoadError::transport(url, "connection refused"))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn head(&self, url: &str) -> TypeLoadResult<HttpResponse> {
        self.answer(Call::Head, url, &self.heads).await
    }

    async fn get(&self, url: &str) -> TypeLoadResult<HttpResponse> {
        self.answer(Call::Get, url, &self.gets).await
    }
}
