//! Resolves the caller's identity from the `Authorization` header.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{AuthError, TokenValidator};
use crate::error::ApiError;
use crate::observability::metrics;

/// Attaches an [`Identity`](crate::auth::Identity) to every request.
///
/// Bad credentials stop the request here with 401. Responses always vary on
/// `Authorization` since their content depends on who asked.
pub async fn authenticate(
    State(validator): State<TokenValidator>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map(str::to_owned).map_err(|_| AuthError::Malformed))
        .transpose();

    let resolved = match header {
        Ok(value) => validator.resolve(value.as_deref()).await,
        Err(e) => Err(e),
    };

    let mut response = match resolved {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            metrics::record_auth_failure(e.reason());
            if let AuthError::Store(ref cause) = e {
                tracing::warn!(error = %cause, "Credential lookup failed");
            }
            ApiError::from(e).into_response()
        }
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
