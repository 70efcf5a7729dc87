//! HTTP plumbing behind the scheduled client.
//!
//! Only the status code and the raw body matter to the scheduler; header and
//! cookie handling stays inside [`HttpTransport`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, REFERER};

/// A GET request against the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    /// Short name used in errors and logs (e.g. `guild-ships`).
    pub resource: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub referer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &RemoteRequest) -> Result<RawResponse>;
}

/// `reqwest` transport sending the configured user agent and cookie.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, cookie: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !cookie.is_empty() {
            let mut value =
                HeaderValue::from_str(cookie).context("cookie is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &RemoteRequest) -> Result<RawResponse> {
        let url = Url::parse_with_params(&request.url, &request.query)
            .with_context(|| format!("invalid request url: {}", request.url))?;
        let mut builder = self.client.get(url);
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer);
        }
        let response = builder
            .send()
            .await
            .with_context(|| format!("request to {} failed", request.resource))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body of {}", request.resource))?;
        tracing::debug!(
            resource = %request.resource,
            status,
            bytes = body.len(),
            "remote response"
        );
        Ok(RawResponse { status, body })
    }
}
