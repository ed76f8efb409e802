//! Configuration validation.
//!
//! Serde handles syntax; this checks what serde cannot (addresses parse,
//! the origin is usable, mount prefixes don't collide). Every violated rule
//! is reported, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_body_bytes must be greater than zero")]
    MaxBodyBytes,

    #[error("upstream.origin `{0}` must be an absolute http(s) URL without query or fragment")]
    Origin(String),

    #[error("upstream.user_agent is not a valid header value")]
    UserAgent,

    #[error("at least one mount must be configured")]
    NoMounts,

    #[error("mount prefix `{0}` must start with `/`, not end with `/`, and not be `/` alone")]
    MountPrefix(String),

    #[error("mount prefix `{0}` is configured more than once")]
    DuplicateMount(String),

    #[error("api_base `{api_base}` of mount `{prefix}` must be empty or start with `/` and not end with `/`")]
    ApiBase { prefix: String, api_base: String },

    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every violation.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::MaxBodyBytes);
    }

    if !is_valid_origin(&config.upstream.origin) {
        errors.push(ValidationError::Origin(config.upstream.origin.clone()));
    }
    if HeaderValue::from_str(&config.upstream.user_agent).is_err() {
        errors.push(ValidationError::UserAgent);
    }

    if config.mounts.is_empty() {
        errors.push(ValidationError::NoMounts);
    }
    let mut seen = HashSet::new();
    for mount in &config.mounts {
        if !is_valid_path_segment(&mount.prefix) {
            errors.push(ValidationError::MountPrefix(mount.prefix.clone()));
        } else if !seen.insert(mount.prefix.as_str()) {
            errors.push(ValidationError::DuplicateMount(mount.prefix.clone()));
        }
        if !mount.api_base.is_empty() && !is_valid_path_segment(&mount.api_base) {
            errors.push(ValidationError::ApiBase {
                prefix: mount.prefix.clone(),
                api_base: mount.api_base.clone(),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.has_host()
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}

fn is_valid_path_segment(path: &str) -> bool {
    path.len() > 1 && path.starts_with('/') && !path.ends_with('/')
}
