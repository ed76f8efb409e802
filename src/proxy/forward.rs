//! One inbound request in, one upstream request out.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → InboundRequest (query pairs, buffered body)
//!     → OPTIONS? answer preflight, stop
//!     → UpstreamRequest (origin + api_base + stripped path, JSON headers)
//!     → Transport::send (the only await on the upstream)
//!     → ProxyResponse::from_upstream
//!     → any error: ProxyResponse::failure (500 envelope)
//! ```

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request};

use crate::config::UpstreamConfig;
use crate::http::response::ProxyResponse;
use crate::proxy::error::ProxyError;
use crate::proxy::upstream::{Transport, UpstreamRequest};
use crate::routing::Mount;

/// The parts of an inbound request the proxy cares about.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl InboundRequest {
    /// Split an axum request, buffering at most `max_body_bytes` of body.
    ///
    /// GET and HEAD bodies are never forwarded, so they are dropped unread
    /// and never count against the limit.
    pub async fn read(request: Request<Body>, max_body_bytes: usize) -> Result<Self, ProxyError> {
        let (parts, body) = request.into_parts();
        let body = if forwards_body(&parts.method) {
            let bytes = axum::body::to_bytes(body, max_body_bytes)
                .await
                .map_err(|e| ProxyError::Body(Box::new(e)))?;
            (!bytes.is_empty()).then_some(bytes)
        } else {
            None
        };

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parse_query(parts.uri.query()),
            body,
        })
    }
}

/// Whether a request with this method has its body sent upstream.
fn forwards_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Decode a raw query string into ordered pairs, keeping repeated keys.
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Forwards requests to the single upstream origin.
#[derive(Debug)]
pub struct ProxyHandler<T> {
    origin: String,
    user_agent: String,
    max_body_bytes: usize,
    transport: T,
}

impl<T: Transport> ProxyHandler<T> {
    pub fn new(upstream: &UpstreamConfig, max_body_bytes: usize, transport: T) -> Self {
        Self {
            origin: upstream.origin.clone(),
            user_agent: upstream.user_agent.clone(),
            max_body_bytes,
            transport,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read the inbound request and proxy it through `mount`.
    pub async fn serve(&self, mount: &Mount, request: Request<Body>) -> ProxyResponse {
        if request.method() == Method::OPTIONS {
            return ProxyResponse::preflight();
        }

        let sub_path = mount.strip(request.uri().path()).to_string();
        match InboundRequest::read(request, self.max_body_bytes).await {
            Ok(inbound) => self.handle(mount, inbound).await,
            Err(err) => {
                tracing::error!(path = %sub_path, error = %err, "Failed to read inbound request");
                crate::observability::metrics::record_upstream_failure(mount.prefix(), err.kind());
                ProxyResponse::failure(&err, &sub_path)
            }
        }
    }

    /// Proxy one request. Never fails: errors become the 500 envelope.
    pub async fn handle(&self, mount: &Mount, inbound: InboundRequest) -> ProxyResponse {
        if inbound.method == Method::OPTIONS {
            return ProxyResponse::preflight();
        }

        let sub_path = mount.strip(&inbound.path).to_string();
        match self.forward(mount, &sub_path, inbound).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    mount = %mount.prefix(),
                    path = %sub_path,
                    kind = err.kind(),
                    error = %err,
                    "API proxy error"
                );
                crate::observability::metrics::record_upstream_failure(mount.prefix(), err.kind());
                ProxyResponse::failure(&err, &sub_path)
            }
        }
    }

    async fn forward(
        &self,
        mount: &Mount,
        sub_path: &str,
        inbound: InboundRequest,
    ) -> Result<ProxyResponse, ProxyError> {
        let request = self.build_request(mount, sub_path, inbound)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            body_bytes = request.body.as_ref().map_or(0, Bytes::len),
            "Forwarding to upstream"
        );

        let response = self.transport.send(request).await?;

        tracing::debug!(
            status = response.status.as_u16(),
            content_type = response.content_type.as_deref().unwrap_or(""),
            body_bytes = response.body.len(),
            "Upstream responded"
        );

        ProxyResponse::from_upstream(response)
    }

    fn build_request(
        &self,
        mount: &Mount,
        sub_path: &str,
        inbound: InboundRequest,
    ) -> Result<UpstreamRequest, ProxyError> {
        let url = mount.upstream_url(&self.origin, sub_path, &inbound.query)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&self.user_agent)?);

        let body = if forwards_body(&inbound.method) {
            inbound.body
        } else {
            None
        };

        Ok(UpstreamRequest {
            method: inbound.method,
            url,
            headers,
            body,
        })
    }
}
