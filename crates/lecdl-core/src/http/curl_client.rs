//! libcurl-backed [`HttpClient`].

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use super::{Flow, HttpClient, HttpResponse, StreamEnd};
use crate::config::HttpConfig;

/// A stream below this many bytes/s for `LOW_SPEED_TIME` is abandoned.
const LOW_SPEED_LIMIT: u32 = 1024;
const LOW_SPEED_TIME: Duration = Duration::from_secs(60);
/// Hard cap for a stream that has no deadline of its own.
const STREAM_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct CurlClient {
    connect_timeout: Duration,
    request_timeout: Duration,
    user_agent: Option<String>,
}

impl CurlClient {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            user_agent: cfg.user_agent.clone(),
        }
    }

    fn easy(&self, url: &str) -> Result<curl::easy::Easy> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        if let Some(ua) = &self.user_agent {
            easy.useragent(ua)?;
        }
        Ok(easy)
    }
}

impl HttpClient for CurlClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut easy = self.easy(url)?;
        easy.timeout(self.request_timeout)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer
                .perform()
                .with_context(|| format!("GET {url} failed"))?;
        }

        let status = easy.response_code().context("no response code")?;
        let effective_url = easy
            .effective_url()?
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string());
        tracing::trace!(url, status, bytes = body.len(), "GET");
        Ok(HttpResponse {
            status,
            effective_url,
            body,
        })
    }

    fn stream(
        &self,
        url: &str,
        deadline: Option<Instant>,
        on_chunk: &mut dyn FnMut(&[u8]) -> Result<Flow>,
    ) -> Result<StreamEnd> {
        let mut easy = self.easy(url)?;
        // Error statuses abort before the body reaches the callback.
        easy.fail_on_error(true)?;
        easy.low_speed_limit(LOW_SPEED_LIMIT)?;
        easy.low_speed_time(LOW_SPEED_TIME)?;
        if deadline.is_none() {
            easy.timeout(STREAM_TIMEOUT)?;
        }
        // The progress callback also fires while no data arrives, so a
        // stalled server cannot hold the transfer past its deadline.
        easy.progress(true)?;

        let mut stopped = false;
        let mut expired = false;
        let mut callback_error = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match on_chunk(data) {
                Ok(Flow::Continue) => Ok(data.len()),
                Ok(Flow::Stop) => {
                    stopped = true;
                    Ok(0)
                }
                Err(e) => {
                    callback_error = Some(e);
                    Ok(0)
                }
            })?;
            transfer.progress_function(|_, _, _, _| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    expired = true;
                    return false;
                }
                true
            })?;
            transfer.perform()
        };

        if let Some(e) = callback_error {
            return Err(e.context(format!("writing body of {url}")));
        }
        if stopped || expired {
            tracing::debug!(url, expired, "stream stopped early");
            return Ok(StreamEnd::Stopped);
        }
        performed.with_context(|| format!("GET {url} failed"))?;
        Ok(StreamEnd::Finished)
    }
}
