//! Movie catalog endpoints over a live socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use catalog_api::data::permissions::{MOVIES_READ, MOVIES_WRITE};
use catalog_api::data::store::MovieStore;
use catalog_api::data::{Models, Movie, StoreError};

mod common;

use common::{json_body, spawn_app, spawn_with_models, test_config, TestApp};

async fn writer(app: &TestApp) -> String {
    app.bearer(true, &[MOVIES_READ, MOVIES_WRITE]).await
}

#[tokio::test]
async fn test_healthcheck() {
    let app = spawn_app(test_config()).await;
    let res = app.client.get(app.url("/v1/healthcheck")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "development");
    assert_eq!(body["system_info"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_then_show() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;

    let res = app
        .client
        .post(app.url("/v1/movies"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Moana",
            "year": 2016,
            "runtime": "107 mins",
            "genres": ["animation", "adventure"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();

    let created = json_body(res).await["movie"].clone();
    assert_eq!(created["title"], "Moana");
    assert_eq!(created["runtime"], "107 mins");
    assert_eq!(created["version"], 1);
    assert!(created.get("created_at").is_none());
    assert_eq!(location, format!("/v1/movies/{}", created["id"]));

    let res = app
        .client
        .get(app.url(&location))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["movie"], created);
}

#[tokio::test]
async fn test_invalid_movie_reports_every_field() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;

    let res = app
        .client
        .post(app.url("/v1/movies"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "",
            "year": 1500,
            "runtime": "-5 mins",
            "genres": ["drama", "drama"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(res).await,
        json!({ "error": {
            "title": "must be provided",
            "year": "must be greater than 1888",
            "runtime": "must be a positive integer",
            "genres": "must not contain duplicate values"
        }})
    );
}

#[tokio::test]
async fn test_missing_genres_must_be_provided() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;

    let bodies = [
        json!({ "title": "Heat", "year": 1995, "runtime": "170 mins" }),
        json!({ "title": "Heat", "year": 1995, "runtime": "170 mins", "genres": null }),
    ];
    for body in bodies {
        let res = app
            .client
            .post(app.url("/v1/movies"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(json_body(res).await, json!({ "error": { "genres": "must be provided" } }));
    }

    let res = app
        .client
        .post(app.url("/v1/movies"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Heat", "year": 1995, "runtime": "170 mins", "genres": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(res).await,
        json!({ "error": { "genres": "must contain at least 1 genre" } })
    );
}

#[tokio::test]
async fn test_bad_bodies_are_400() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;

    let cases = [
        r#"{"title": "Heat""#.to_string(),
        r#"{"title": "Heat", "rating": 5}"#.to_string(),
        r#"{"title": "Heat", "runtime": 170}"#.to_string(),
        String::new(),
    ];
    for body in cases {
        let res = app
            .client
            .post(app.url("/v1/movies"))
            .bearer_auth(&token)
            .header("content-type", "application/json")
            .body(body.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        assert!(json_body(res).await["error"].is_string());
    }
}

#[tokio::test]
async fn test_non_positive_ids_are_not_found() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;

    for path in ["/v1/movies/0", "/v1/movies/-1", "/v1/movies/abc", "/v1/movies/999"] {
        let res = app
            .client
            .get(app.url(path))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(
            json_body(res).await,
            json!({ "error": "the requested resource could not be found" })
        );
    }
}

#[tokio::test]
async fn test_list_movies_in_id_order() {
    let app = spawn_app(test_config()).await;
    let token = app.bearer(true, &[MOVIES_READ]).await;
    app.seed_movie("First").await;
    app.seed_movie("Second").await;

    let res = app
        .client
        .get(app.url("/v1/movies"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body = json_body(res).await;
    let titles: Vec<_> = body["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[tokio::test]
async fn test_partial_update_bumps_version() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;
    let movie = app.seed_movie("The Matrx").await;

    let res = app
        .client
        .patch(app.url(&format!("/v1/movies/{}", movie.id)))
        .bearer_auth(&token)
        .json(&json!({ "title": "The Matrix", "version": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = json_body(res).await["movie"].clone();
    assert_eq!(updated["title"], "The Matrix");
    assert_eq!(updated["year"], 1999);
    assert_eq!(updated["version"], 2);

    // Replaying the same version now conflicts.
    let res = app
        .client
        .patch(app.url(&format!("/v1/movies/{}", movie.id)))
        .bearer_auth(&token)
        .json(&json!({ "year": 2000, "version": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "unable to update the record due to an edit conflict, please try again" })
    );

    let res = app
        .client
        .patch(app.url(&format!("/v1/movies/{}", movie.id)))
        .bearer_auth(&token)
        .header("X-Expected-Version", "1")
        .json(&json!({ "year": 2000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let stored = app.models.get_movie(movie.id).await.unwrap();
    assert_eq!(stored.year, 1999);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_concurrent_patches_have_one_winner() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;
    let movie = app.seed_movie("Race").await;
    let url = app.url(&format!("/v1/movies/{}", movie.id));

    let requests = (0..2).map(|i| {
        app.client
            .patch(url.clone())
            .bearer_auth(&token)
            .json(&json!({ "title": format!("Race {}", i), "version": 1 }))
            .send()
    });
    let results = futures_join(requests.collect()).await;

    let mut statuses: Vec<_> = results.iter().map(|r| r.status()).collect();
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(app.models.get_movie(movie.id).await.unwrap().version, 2);
}

async fn futures_join<F>(futures: Vec<F>) -> Vec<reqwest::Response>
where
    F: std::future::Future<Output = reqwest::Result<reqwest::Response>> + Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.unwrap().unwrap());
    }
    responses
}

#[tokio::test]
async fn test_delete() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;
    let movie = app.seed_movie("Gone").await;
    let url = app.url(&format!("/v1/movies/{}", movie.id));

    let res = app.client.delete(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({ "message": "movie successfully deleted" })
    );

    let res = app.client.delete(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let app = spawn_app(test_config()).await;
    let token = writer(&app).await;

    let res = app.client.get(app.url("/v1/nothing-here")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "the requested resource could not be found" })
    );

    let res = app
        .client
        .put(app.url("/v1/movies/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "the PUT method is not supported for this resource" })
    );
}

struct StalledMovies;

#[async_trait]
impl MovieStore for StalledMovies {
    async fn insert_movie(&self, _movie: Movie) -> Result<Movie, StoreError> {
        std::future::pending().await
    }
    async fn get_movie(&self, _id: i64) -> Result<Movie, StoreError> {
        std::future::pending().await
    }
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        std::future::pending().await
    }
    async fn update_movie(&self, _movie: &Movie) -> Result<i32, StoreError> {
        std::future::pending().await
    }
    async fn delete_movie(&self, _id: i64) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

struct PanickingMovies;

#[async_trait]
impl MovieStore for PanickingMovies {
    async fn insert_movie(&self, _movie: Movie) -> Result<Movie, StoreError> {
        panic!("insert exploded")
    }
    async fn get_movie(&self, _id: i64) -> Result<Movie, StoreError> {
        panic!("get exploded")
    }
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        panic!("list exploded")
    }
    async fn update_movie(&self, _movie: &Movie) -> Result<i32, StoreError> {
        panic!("update exploded")
    }
    async fn delete_movie(&self, _id: i64) -> Result<(), StoreError> {
        panic!("delete exploded")
    }
}

#[tokio::test]
async fn test_storage_deadline_is_a_server_error() {
    let mut config = test_config();
    config.storage.query_timeout_ms = 50;
    let models = Models::in_memory(Duration::from_millis(50)).with_movies(Arc::new(StalledMovies));
    let app = spawn_with_models(config, models).await;
    let token = app.bearer(true, &[MOVIES_READ]).await;

    let res = app
        .client
        .get(app.url("/v1/movies"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "the server encountered a problem and could not process your request" })
    );
}

#[tokio::test]
async fn test_request_deadline_is_a_server_error() {
    let mut config = test_config();
    config.server.request_timeout_secs = 1;
    config.storage.query_timeout_ms = 5_000;
    let models =
        Models::in_memory(config.storage.query_timeout()).with_movies(Arc::new(StalledMovies));
    let app = spawn_with_models(config, models).await;
    let token = app.bearer(true, &[MOVIES_READ]).await;

    let res = app
        .client
        .get(app.url("/v1/movies"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "the server encountered a problem and could not process your request" })
    );
}

#[tokio::test]
async fn test_panics_are_contained() {
    let config = test_config();
    let models =
        Models::in_memory(config.storage.query_timeout()).with_movies(Arc::new(PanickingMovies));
    let app = spawn_with_models(config, models).await;
    let token = app.bearer(true, &[MOVIES_READ]).await;

    let res = app
        .client
        .get(app.url("/v1/movies"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "the server encountered a problem and could not process your request" })
    );

    // The server keeps serving on a new connection.
    let res = app.client.get(app.url("/v1/healthcheck")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
