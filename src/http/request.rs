//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Resolve the client address used for rate limiting
//! - Decode JSON bodies with client-facing error messages
//! - Parse resource identifiers from the path
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body decoding failures are 400s, never 500s
//! - Malformed identifiers are indistinguishable from missing records

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, Request},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ApiError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Request ID source for `SetRequestIdLayer`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Key used to identify a client for rate limiting.
///
/// The peer IP by default. With `trust_proxy_headers`, the first
/// `X-Forwarded-For` entry, then `X-Real-IP`, then the peer IP.
pub fn client_address<B>(request: &axum::http::Request<B>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(addr) = forwarded_address(request.headers()) {
            return addr;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    let first_forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    first_forwarded
        .or_else(|| {
            headers
                .get(X_REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

/// Parse a positive record id. Anything else is reported as not found.
pub fn read_id_param(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

/// JSON body extractor whose failures become 400 envelopes.
///
/// The body limit comes from `DefaultBodyLimit` on the router. Unknown
/// fields are rejected by the target types themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::BadRequest("body is larger than the allowed maximum".to_string())
            } else {
                ApiError::BadRequest(format!("unable to read body: {}", rejection.body_text()))
            }
        })?;

        decode_json(&bytes).map(ApiJson)
    }
}

/// Decode a JSON document, describing failures in client terms.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("body must not be empty".to_string()));
    }

    serde_json::from_slice(bytes).map_err(|e| {
        let message = match e.classify() {
            Category::Eof => "body contains badly-formed JSON".to_string(),
            Category::Syntax => {
                format!("body contains badly-formed JSON (at character {})", e.column())
            }
            Category::Data => {
                format!("body contains invalid data: {}", strip_position(&e.to_string()))
            }
            Category::Io => "unable to read body".to_string(),
        };
        ApiError::BadRequest(message)
    })
}

fn strip_position(message: &str) -> &str {
    message.split(" at line ").next().unwrap_or(message)
}
