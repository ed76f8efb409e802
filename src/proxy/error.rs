//! Forwarding errors.
//!
//! Callers only ever see one category of failure (the 500 envelope built in
//! `http::response`); the variants exist for logs and metrics.

use thiserror::Error;

/// Boxed source error produced by a transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream URL could not be assembled.
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A fixed outbound header could not be encoded.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),

    /// The inbound body could not be read (client abort, size limit).
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    /// The upstream call itself failed (DNS, connect, reset, body read).
    #[error("{0}")]
    Transport(#[source] BoxError),

    /// The upstream declared JSON but sent something else.
    #[error("invalid JSON from upstream: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProxyError {
    /// Short, stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidUrl(_) => "invalid_url",
            ProxyError::InvalidHeader(_) => "invalid_header",
            ProxyError::Body(_) => "body",
            ProxyError::Transport(_) => "transport",
            ProxyError::Decode(_) => "decode",
        }
    }
}
