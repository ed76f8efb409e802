//! Response shaping.
//!
//! # Responsibilities
//! - Attach the permissive CORS policy to every proxy response
//! - Normalize JSON upstream bodies, pass anything else through
//! - Build the fixed 500 envelope and the 404 for unmounted paths
//!
//! # Design Decisions
//! - Bodies are fully buffered; nothing is streamed
//! - Outbound `Content-Type` is always `application/json`, even when the
//!   upstream body was plain text

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::proxy::error::ProxyError;
use crate::proxy::upstream::UpstreamResponse;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

const APPLICATION_JSON: &str = "application/json";

/// A fully buffered response on its way back to the caller.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a str,
    message: String,
    path: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct NotFound<'a> {
    error: &'a str,
    path: &'a str,
}

impl ProxyResponse {
    /// Answer to a CORS preflight: 200, empty body, CORS headers only.
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            headers: cors_headers(),
            body: Bytes::new(),
        }
    }

    /// Mirror an upstream response.
    ///
    /// A body declared as JSON is decoded and re-encoded; anything else is
    /// forwarded byte-for-byte.
    pub fn from_upstream(upstream: UpstreamResponse) -> Result<Self, ProxyError> {
        let body = if upstream.is_json() {
            let value: serde_json::Value = serde_json::from_slice(&upstream.body)?;
            Bytes::from(serde_json::to_vec(&value)?)
        } else {
            upstream.body
        };

        Ok(Self {
            status: upstream.status,
            headers: json_headers(),
            body,
        })
    }

    /// The fixed 500 envelope.
    pub fn failure(err: &ProxyError, path: &str) -> Self {
        let envelope = ErrorEnvelope {
            error: "Internal Server Error",
            message: err.to_string(),
            path,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        Self::json(StatusCode::INTERNAL_SERVER_ERROR, &envelope)
    }

    /// A path no mount owns.
    pub fn not_found(path: &str) -> Self {
        Self::json(
            StatusCode::NOT_FOUND,
            &NotFound {
                error: "Not Found",
                path,
            },
        )
    }

    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        // Both envelopes are plain string maps; serialization cannot fail.
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self {
            status,
            headers: json_headers(),
            body: Bytes::from(body),
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// The permissive CORS triplet.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers
}

fn json_headers() -> HeaderMap {
    let mut headers = cors_headers();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_JSON),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::{json, Value};

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
    }

    fn upstream(status: u16, content_type: Option<&str>, body: &'static str) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.map(str::to_owned),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_preflight() {
        let res = ProxyResponse::preflight();
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.is_empty());
        assert_cors(&res.headers);
        assert_eq!(res.headers.len(), 3);
    }

    #[test]
    fn test_json_body_is_reencoded() {
        let res = ProxyResponse::from_upstream(upstream(
            200,
            Some("application/json;charset=UTF-8"),
            "{ \"a\" :  1 }",
        ))
        .unwrap();

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(&res.body[..], b"{\"a\":1}");
        assert_cors(&res.headers);
        assert_eq!(res.headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_status_mirrors_upstream() {
        let res = ProxyResponse::from_upstream(upstream(
            404,
            Some("application/json"),
            r#"{"resourceType":"OperationOutcome","issue":[]}"#,
        ))
        .unwrap();

        assert_eq!(res.status, StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(body, json!({"resourceType": "OperationOutcome", "issue": []}));
    }

    #[test]
    fn test_text_passes_through_as_json_content_type() {
        let res =
            ProxyResponse::from_upstream(upstream(200, Some("text/plain"), "plain text")).unwrap();

        assert_eq!(&res.body[..], b"plain text");
        assert_eq!(res.headers[header::CONTENT_TYPE], "application/json");
        assert_cors(&res.headers);
    }

    #[test]
    fn test_missing_content_type_passes_through() {
        let res = ProxyResponse::from_upstream(upstream(502, None, "<html>bad</html>")).unwrap();
        assert_eq!(res.status, StatusCode::BAD_GATEWAY);
        assert_eq!(&res.body[..], b"<html>bad</html>");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = ProxyResponse::from_upstream(upstream(200, Some("application/json"), "{oops"))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Decode(_)));
    }

    #[test]
    fn test_failure_envelope() {
        let err = ProxyError::Transport("connection refused".into());
        let res = ProxyResponse::failure(&err, "/codesystem/lookup");

        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&res.headers);
        assert_eq!(res.headers[header::CONTENT_TYPE], "application/json");

        let body: Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "connection refused");
        assert_eq!(body["path"], "/codesystem/lookup");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
    }

    #[test]
    fn test_not_found() {
        let res = ProxyResponse::not_found("/nowhere");
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_cors(&res.headers);
        let body: Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(body, json!({"error": "Not Found", "path": "/nowhere"}));
    }
}
