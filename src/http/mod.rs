//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, mount dispatch)
//!     → request.rs (request ID)
//!     → [proxy forwards upstream]
//!     → response.rs (CORS, body normalization, error envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ProxyResponse;
pub use server::HttpServer;
