//! Login.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::data::user::{validate_email, validate_password_plaintext};
use crate::data::{Scope, StoreError, Token, Validator};
use crate::error::ApiError;
use crate::http::request::ApiJson;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsInput {
    pub email: String,
    pub password: String,
}

/// Exchanges email and password for an authentication token.
pub async fn create_authentication_token(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CredentialsInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut v = Validator::new();
    validate_email(&mut v, &input.email);
    validate_password_plaintext(&mut v, &input.password);
    v.into_result().map_err(ApiError::Validation)?;

    let user = match state.models.get_user_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::RecordNotFound) => {
            metrics::record_auth_failure("unknown_email");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    let stored = user.password.clone();
    let plaintext = input.password;
    let matches = tokio::task::spawn_blocking(move || stored.matches(&plaintext))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    if !matches {
        metrics::record_auth_failure("wrong_password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = Token::generate(user.id, state.config.auth.token_ttl(), Scope::Authentication);
    state.models.insert_token(&token).await?;
    tracing::info!(user_id = user.id, "Authentication token issued");

    Ok((StatusCode::CREATED, Json(json!({ "authentication_token": token }))))
}
