//! Upstream request executor
//!
//! Issues a single HTTP call against the upstream with the session's
//! cookies and the fixed browser header set. Bodies are returned untouched.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, COOKIE};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::session::Session;
use crate::upstream::headers::build_browser_headers;

/// Status and body of an upstream response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Upstream HTTP client
pub struct UpstreamExecutor {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl UpstreamExecutor {
    /// Create a new executor
    pub fn new(client: reqwest::Client, config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            base_url: config.upstream_base_url.clone(),
            headers: build_browser_headers(&config.upstream_base_url)?,
        })
    }

    /// Send `body` (if any) to `path` using `session`, bounded by `timeout`
    #[instrument(skip(self, session, body), fields(method = %method, path = %path))]
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        session: &Session,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<RawResponse, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.headers.clone())
            .timeout(timeout);

        if let Some(cookie) = Url::parse(&url)
            .ok()
            .and_then(|parsed| session.cookie_header(&parsed))
        {
            request = request.header(COOKIE, cookie);
        }
        if let Some(token) = session.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(status = %status, bytes = body.len(), "Upstream response");
        Ok(RawResponse { status, body })
    }
}
