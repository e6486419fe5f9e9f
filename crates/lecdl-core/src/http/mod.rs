//! HTTP access used by the resolver and the fetch stage.
//!
//! The engine only depends on [`HttpClient`]; the production implementation
//! is libcurl-based and blocking, so async callers go through `spawn_blocking`.

mod curl_client;
#[cfg(test)]
pub(crate) mod fake;

use anyhow::{Context, Result};
use std::time::Instant;

pub use curl_client::CurlClient;

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    /// URL after redirects.
    pub effective_url: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Returned by a streaming callback after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// How a streamed transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Finished,
    /// The callback returned [`Flow::Stop`] or the deadline passed.
    Stopped,
}

pub trait HttpClient: Send + Sync {
    /// GET `url`, following redirects. Non-2xx statuses are returned, not raised.
    fn get(&self, url: &str) -> Result<HttpResponse>;

    /// GET `url` and hand the body to `on_chunk` as it arrives.
    ///
    /// Fails on a non-2xx status before any chunk is delivered. Once
    /// `deadline` passes the transfer ends as [`StreamEnd::Stopped`], also
    /// while the server sends nothing.
    fn stream(
        &self,
        url: &str,
        deadline: Option<Instant>,
        on_chunk: &mut dyn FnMut(&[u8]) -> Result<Flow>,
    ) -> Result<StreamEnd>;

    /// GET `url` as UTF-8 text, requiring a 2xx status.
    fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.get(url)?;
        if !resp.is_success() {
            anyhow::bail!("GET {} returned HTTP {}", url, resp.status);
        }
        String::from_utf8(resp.body).with_context(|| format!("body of {url} is not UTF-8"))
    }
}
