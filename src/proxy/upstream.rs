//! Upstream transport.
//!
//! The proxy makes exactly one outbound call per request. `Transport` is the
//! seam around that call so the handler can run against a recording
//! transport in tests.

use std::future::Future;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode};
use url::Url;

use crate::proxy::error::ProxyError;

/// A fully assembled outbound request.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// The upstream's answer, fully buffered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// True when the upstream declared a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

/// Sends one request to the upstream and buffers the response.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: UpstreamRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, ProxyError>> + Send;
}

/// Production transport backed by `reqwest`.
///
/// Idle connections are not kept, so no state survives between requests.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::Transport(Box::new(e)))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        // Callers see this message, so it must not name the upstream URL.
        let response = builder
            .send()
            .await
            .map_err(|e| ProxyError::Transport(Box::new(e.without_url())))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Transport(Box::new(e.without_url())))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
