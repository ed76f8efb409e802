//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (request ID, tracing, timeout)
//! - Dispatch every request to the mount that owns its path
//! - Hand the request to the proxy handler and record the outcome
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::{ProxyResponse, ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::forward::ProxyHandler;
use crate::proxy::upstream::{ReqwestTransport, Transport};
use crate::routing::MountTable;

/// Application state injected into the handler.
pub struct AppState<T> {
    pub proxy: Arc<ProxyHandler<T>>,
    pub mounts: Arc<MountTable>,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
            mounts: self.mounts.clone(),
        }
    }
}

/// HTTP server for the API proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that forwards over HTTP with `reqwest`.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a server that forwards through the given transport.
    pub fn with_transport<T: Transport>(config: ProxyConfig, transport: T) -> Self {
        let proxy = Arc::new(ProxyHandler::new(
            &config.upstream,
            config.listener.max_body_bytes,
            transport,
        ));
        let mounts = Arc::new(MountTable::from_config(&config.mounts));

        let state = AppState { proxy, mounts };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<T: Transport>(config: &ProxyConfig, state: AppState<T>) -> Router {
        Router::new()
            .fallback(proxy_handler::<T>)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    // Responses the handler never built (timeouts) still need CORS.
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::ACCESS_CONTROL_ALLOW_ORIGIN,
                        HeaderValue::from_static(ALLOW_ORIGIN),
                    ))
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::ACCESS_CONTROL_ALLOW_HEADERS,
                        HeaderValue::from_static(ALLOW_HEADERS),
                    ))
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::ACCESS_CONTROL_ALLOW_METHODS,
                        HeaderValue::from_static(ALLOW_METHODS),
                    ))
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// A handle to the router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin,
            mounts = self.config.mounts.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Looks up the mount and forwards the request upstream.
async fn proxy_handler<T: Transport>(
    State(state): State<AppState<T>>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(mount) = state.mounts.match_path(&path) else {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, "No mount matched");
        metrics::record_request(method.as_str(), StatusCode::NOT_FOUND.as_u16(), "none", start_time);
        return ProxyResponse::not_found(&path).into_response();
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        mount = %mount.prefix(),
        "Proxying request"
    );

    let response = state.proxy.serve(mount, request).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status.as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request complete"
    );
    metrics::record_request(
        method.as_str(),
        response.status.as_u16(),
        mount.prefix(),
        start_time,
    );

    response.into_response()
}
