//! Request handlers and the route table.

pub mod health;
pub mod movies;
pub mod tokens;
pub mod users;

use axum::{
    http::Method,
    routing::{get, patch, post, put},
    Router,
};

use crate::auth::GuardChain;
use crate::data::permissions::{MOVIES_READ, MOVIES_WRITE};
use crate::error::ApiError;
use crate::http::middleware::guarded;
use crate::http::server::AppState;

/// All `/v1` routes with their guard chains.
pub fn api_routes() -> Router<AppState> {
    let read = GuardChain::permission(MOVIES_READ);
    let write = GuardChain::permission(MOVIES_WRITE);

    Router::new()
        .route("/v1/healthcheck", get(health::healthcheck))
        .route(
            "/v1/movies",
            guarded(get(movies::list_movies), read.clone())
                .merge(guarded(post(movies::create_movie), write.clone())),
        )
        .route(
            "/v1/movies/{id}",
            guarded(get(movies::show_movie), read)
                .merge(guarded(patch(movies::update_movie).delete(movies::delete_movie), write)),
        )
        .route("/v1/users", post(users::register_user))
        .route("/v1/users/activated", put(users::activate_user))
        .route("/v1/tokens/authentication", post(tokens::create_authentication_token))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
