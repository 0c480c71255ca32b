//! Movie catalog endpoints.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::data::movie::validate_movie;
use crate::data::{Movie, Runtime, StoreError, Validator};
use crate::error::ApiError;
use crate::http::request::{read_id_param, ApiJson};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Optional alternative to the `version` body field on PATCH.
pub const X_EXPECTED_VERSION: HeaderName = HeaderName::from_static("x-expected-version");

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMovieInput {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Option<Vec<String>>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateMovieInput {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
    pub version: Option<i32>,
}

fn check(movie: &Movie) -> Result<(), ApiError> {
    let mut v = Validator::new();
    validate_movie(&mut v, movie);
    v.into_result().map_err(ApiError::Validation)
}

fn conflict(err: StoreError) -> ApiError {
    if matches!(err, StoreError::EditConflict) {
        metrics::record_edit_conflict();
    }
    ApiError::from(err)
}

pub async fn create_movie(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateMovieInput>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();
    v.check(input.genres.is_some(), "genres", "must be provided");
    let genres = input.genres.unwrap_or_default();
    let movie = Movie::new(input.title, input.year, input.runtime, genres);
    validate_movie(&mut v, &movie);
    v.into_result().map_err(ApiError::Validation)?;

    let movie = state.models.insert_movie(movie).await?;
    tracing::info!(movie_id = movie.id, "Movie created");

    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    )
        .into_response())
}

pub async fn list_movies(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let movies = state.models.list_movies().await?;
    Ok(Json(json!({ "movies": movies })))
}

pub async fn show_movie(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = read_id_param(&raw_id)?;
    let movie = state.models.get_movie(id).await?;
    Ok(Json(json!({ "movie": movie })))
}

pub async fn update_movie(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<UpdateMovieInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = read_id_param(&raw_id)?;
    let mut movie = state.models.get_movie(id).await?;

    let expected = match input.version {
        Some(version) => Some(version),
        None => expected_version_header(&headers)?,
    };
    if let Some(expected) = expected {
        if expected != movie.version {
            metrics::record_edit_conflict();
            return Err(ApiError::EditConflict);
        }
    }

    if let Some(title) = input.title {
        movie.title = title;
    }
    if let Some(year) = input.year {
        movie.year = year;
    }
    if let Some(runtime) = input.runtime {
        movie.runtime = runtime;
    }
    if let Some(genres) = input.genres {
        movie.genres = genres;
    }
    check(&movie)?;

    movie.version = state.models.update_movie(&movie).await.map_err(conflict)?;
    tracing::info!(movie_id = movie.id, version = movie.version, "Movie updated");

    Ok(Json(json!({ "movie": movie })))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = read_id_param(&raw_id)?;
    state.models.delete_movie(id).await?;
    tracing::info!(movie_id = id, "Movie deleted");
    Ok(Json(json!({ "message": "movie successfully deleted" })))
}

fn expected_version_header(headers: &HeaderMap) -> Result<Option<i32>, ApiError> {
    headers
        .get(X_EXPECTED_VERSION)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i32>().ok())
                .ok_or_else(|| {
                    ApiError::BadRequest("X-Expected-Version must be an integer".to_string())
                })
        })
        .transpose()
}
