//! API error type and its JSON envelope.
//!
//! Every failure leaves the service as `{"error": <message or field map>}`
//! with a matching status code. Internal faults never expose their cause to
//! the client; the cause travels on the response as an [`InternalFault`]
//! extension and is logged by the fault middleware.

use std::collections::BTreeMap;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::{AuthError, Rejection};
use crate::data::StoreError;

pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Cause of a 500, attached to the response for logging.
#[derive(Debug, Clone)]
pub struct InternalFault(pub String);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("invalid authentication credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("failed validation")]
    Validation(BTreeMap<String, String>),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("internal fault: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        Self::Internal(cause.to_string())
    }

    /// A single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::Validation(BTreeMap::from([(field.to_string(), message.to_string())]))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidAuthenticationToken | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Rejected(Rejection::AuthenticationRequired) => StatusCode::UNAUTHORIZED,
            Self::Rejected(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::EditConflict => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound => Self::NotFound,
            StoreError::EditConflict => Self::EditConflict,
            StoreError::DuplicateEmail => {
                Self::invalid("email", "a user with this email address already exists")
            }
            other => Self::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Malformed | AuthError::InvalidOrExpired => Self::InvalidAuthenticationToken,
            AuthError::Store(e) => Self::internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(fields) => json!({ "error": fields }),
            Self::Internal(_) => json!({ "error": SERVER_ERROR_MESSAGE }),
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();

        match self {
            Self::InvalidAuthenticationToken
            | Self::Rejected(Rejection::AuthenticationRequired) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::Internal(cause) => {
                response.extensions_mut().insert(InternalFault(cause));
            }
            _ => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_fault_is_opaque() {
        let response = ApiError::internal("connection reset by peer").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let fault = response.extensions().get::<InternalFault>().cloned().unwrap();
        assert_eq!(fault.0, "connection reset by peer");

        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": SERVER_ERROR_MESSAGE }));
    }

    #[tokio::test]
    async fn test_validation_body_is_a_field_map() {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), "must be provided".to_string());
        fields.insert("year".to_string(), "must be greater than 1888".to_string());
        let response = ApiError::Validation(fields).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["title"], "must be provided");
        assert_eq!(body["error"]["year"], "must be greater than 1888");
    }

    #[test]
    fn test_token_failures_challenge_for_bearer() {
        let response = ApiError::InvalidAuthenticationToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = ApiError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_rejections_map_to_401_and_403() {
        assert_eq!(
            ApiError::from(Rejection::AuthenticationRequired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(Rejection::InactiveAccount).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(Rejection::NotPermitted).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_errors() {
        assert!(matches!(ApiError::from(StoreError::RecordNotFound), ApiError::NotFound));
        assert!(matches!(ApiError::from(StoreError::EditConflict), ApiError::EditConflict));
        assert!(matches!(
            ApiError::from(StoreError::Backend("disk full".into())),
            ApiError::Internal(ref cause) if cause.contains("disk full")
        ));
        match ApiError::from(StoreError::DuplicateEmail) {
            ApiError::Validation(fields) => assert!(fields.contains_key("email")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_method_not_allowed_message() {
        let err = ApiError::MethodNotAllowed(Method::PUT);
        assert_eq!(err.to_string(), "the PUT method is not supported for this resource");
    }
}
