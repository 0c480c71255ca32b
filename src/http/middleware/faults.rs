//! Fault logging, panic isolation and request deadlines.

use std::any::Any;

use axum::{
    extract::Request,
    BoxError,
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use tower::timeout::error::Elapsed;

use crate::error::{ApiError, InternalFault};

/// Logs the cause of any 500 produced further in, with method and URL.
pub async fn log_internal_faults(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    if let Some(InternalFault(cause)) = response.extensions().get::<InternalFault>() {
        tracing::error!(
            request_method = %method,
            request_url = %uri,
            error = %cause,
            "Internal server error"
        );
    }

    response
}

/// Turns a handler panic into a 500 and closes the connection.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = ApiError::Internal(format!("panic: {}", detail)).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Error handler for the request deadline layer. An expired request is a
/// 500 and reaches the fault log.
pub async fn handle_request_timeout(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::internal("request exceeded its deadline")
    } else {
        ApiError::internal(err)
    }
}
