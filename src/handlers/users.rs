//! Registration and activation.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::data::permissions::MOVIES_READ;
use crate::data::token::validate_token_plaintext;
use crate::data::user::{validate_email, validate_name, validate_password_plaintext};
use crate::data::{Password, Scope, StoreError, Token, User, Validator};
use crate::error::ApiError;
use crate::http::request::ApiJson;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivateUserInput {
    pub token: String,
}

/// Creates an inactive account with read access and issues its activation token.
///
/// Delivery of the token is out of band; it is written to the log.
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterUserInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut v = Validator::new();
    validate_name(&mut v, &input.name);
    validate_email(&mut v, &input.email);
    validate_password_plaintext(&mut v, &input.password);
    v.into_result().map_err(ApiError::Validation)?;

    let cost = state.config.auth.bcrypt_cost;
    let plaintext = input.password;
    let password = tokio::task::spawn_blocking(move || Password::hash(&plaintext, cost))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    let user = state
        .models
        .insert_user(User::new(input.name, input.email, password))
        .await?;

    state.models.add_permissions_for_user(user.id, &[MOVIES_READ]).await?;

    let token = Token::generate(user.id, state.config.auth.activation_ttl(), Scope::Activation);
    state.models.insert_token(&token).await?;

    tracing::info!(
        user_id = user.id,
        activation_token = %token.plaintext,
        expiry = %token.expiry,
        "User registered, activation token issued"
    );

    Ok((StatusCode::ACCEPTED, Json(json!({ "user": user }))))
}

/// Consumes an activation token and marks its user active.
pub async fn activate_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ActivateUserInput>,
) -> Result<Json<Value>, ApiError> {
    let mut v = Validator::new();
    validate_token_plaintext(&mut v, &input.token);
    v.into_result().map_err(ApiError::Validation)?;

    let hash = crate::data::token::hash_plaintext(&input.token);
    let mut user = match state.models.get_user_for_token(Scope::Activation, &hash).await {
        Ok(user) => user,
        Err(StoreError::RecordNotFound) => {
            metrics::record_auth_failure("activation_token");
            return Err(ApiError::invalid("token", "invalid or expired activation token"));
        }
        Err(e) => return Err(e.into()),
    };

    user.activated = true;
    user.version = state.models.update_user(&user).await.map_err(|e| {
        if matches!(e, StoreError::EditConflict) {
            metrics::record_edit_conflict();
        }
        ApiError::from(e)
    })?;

    state.models.delete_tokens_for_user(Scope::Activation, user.id).await?;
    tracing::info!(user_id = user.id, "User activated");

    Ok(Json(json!({ "user": user })))
}
