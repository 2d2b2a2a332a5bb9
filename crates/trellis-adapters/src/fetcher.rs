//! HTTP download adapter using `ureq`.
//!
//! Redirects are not followed: a redirect target never went through URL
//! validation, so following it would reopen the SSRF hole the engine closed.

use std::io::Read;

use tracing::{debug, instrument};
use trellis_core::{
    application::{ApplicationError, ports::Fetcher},
    domain::FetchLimits,
    error::TrellisResult,
};
use url::Url;

/// Blocking HTTPS fetcher.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    user_agent: Option<String>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn agent(&self, limits: &FetchLimits) -> ureq::Agent {
        let mut builder = ureq::AgentBuilder::new()
            .timeout(limits.timeout)
            .redirects(0);
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua);
        }
        builder.build()
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    fn fetch(&self, url: &Url, limits: &FetchLimits) -> TrellisResult<Vec<u8>> {
        let failed = |reason: String| ApplicationError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .agent(limits)
            .request_url("GET", url)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => failed(format!("HTTP error {}", code)),
                ureq::Error::Transport(t) => failed(format!("Network error: {}", t)),
            })?;

        // Declared size first; the body read below is capped regardless.
        if let Some(declared) = response
            .header("Content-Length")
            .and_then(|s| s.parse::<u64>().ok())
        {
            if declared > limits.max_bytes {
                return Err(too_large(url, declared, limits.max_bytes));
            }
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .take(limits.max_bytes + 1)
            .read_to_end(&mut body)
            .map_err(|e| failed(format!("Failed to read response: {}", e)))?;

        let size = body.len() as u64;
        if size > limits.max_bytes {
            return Err(too_large(url, size, limits.max_bytes));
        }
        debug!(bytes = size, "download complete");
        Ok(body)
    }
}

fn too_large(url: &Url, size: u64, limit: u64) -> trellis_core::error::TrellisError {
    ApplicationError::DownloadTooLarge {
        url: url.to_string(),
        size,
        limit,
    }
    .into()
}
