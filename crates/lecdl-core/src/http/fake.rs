//! In-memory [`HttpClient`] for unit tests.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{Flow, HttpClient, HttpResponse, StreamEnd};

#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub status: u32,
    pub body: Vec<u8>,
    /// Redirect target reported as the effective URL.
    pub effective_url: Option<String>,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHttp {
    routes: HashMap<String, Route>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status: 200,
                body: body.into(),
                effective_url: None,
                chunk_size: 64 * 1024,
                chunk_delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn with_status(mut self, url: &str, status: u32) -> Self {
        self = self.with(url, Vec::new());
        if let Some(route) = self.routes.get_mut(url) {
            route.status = status;
        }
        self
    }

    pub fn with_redirect(mut self, url: &str, effective: &str, body: impl Into<Vec<u8>>) -> Self {
        self = self.with(url, body);
        if let Some(route) = self.routes.get_mut(url) {
            route.effective_url = Some(effective.to_string());
        }
        self
    }

    pub fn with_slow(
        mut self,
        url: &str,
        body: impl Into<Vec<u8>>,
        chunk_size: usize,
        chunk_delay: Duration,
    ) -> Self {
        self = self.with(url, body);
        if let Some(route) = self.routes.get_mut(url) {
            route.chunk_size = chunk_size.max(1);
            route.chunk_delay = chunk_delay;
        }
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn route(&self, url: &str) -> Route {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.routes.get(url).cloned().unwrap_or(Route {
            status: 404,
            body: Vec::new(),
            effective_url: None,
            chunk_size: 1,
            chunk_delay: Duration::ZERO,
        })
    }
}

impl HttpClient for FakeHttp {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let route = self.route(url);
        Ok(HttpResponse {
            status: route.status,
            effective_url: route.effective_url.unwrap_or_else(|| url.to_string()),
            body: route.body,
        })
    }

    fn stream(
        &self,
        url: &str,
        deadline: Option<Instant>,
        on_chunk: &mut dyn FnMut(&[u8]) -> Result<Flow>,
    ) -> Result<StreamEnd> {
        let route = self.route(url);
        if !(200..300).contains(&route.status) {
            anyhow::bail!("GET {} returned HTTP {}", url, route.status);
        }
        for chunk in route.body.chunks(route.chunk_size) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(StreamEnd::Stopped);
            }
            std::thread::sleep(route.chunk_delay);
            if on_chunk(chunk)? == Flow::Stop {
                return Ok(StreamEnd::Stopped);
            }
        }
        Ok(StreamEnd::Finished)
    }
}
