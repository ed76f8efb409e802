//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → forward.rs (preflight short-circuit, build UpstreamRequest)
//!     → upstream.rs (Transport: one call, response fully buffered)
//!     → http::response (reshape for the caller)
//! ```
//!
//! # Design Decisions
//! - One attempt per request: no retry, no fallback, no circuit breaking
//! - Upstream non-2xx is passed through; only transport/decode failures are errors
//! - Stateless: nothing is cached or reused across requests

pub mod error;
pub mod forward;
pub mod upstream;

pub use error::ProxyError;
pub use forward::{InboundRequest, ProxyHandler};
pub use upstream::{ReqwestTransport, Transport, UpstreamRequest, UpstreamResponse};
