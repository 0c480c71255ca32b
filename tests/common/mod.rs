//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;

use catalog_api::config::AppConfig;
use catalog_api::data::{Models, Movie, Password, Runtime, Scope, Token, User};
use catalog_api::{HttpServer, Shutdown};

pub const PASSWORD: &str = "pa55word-for-tests";

/// Defaults tuned for tests: ephemeral port, cheap hashing, no limiter.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.rate_limit.enabled = false;
    config.auth.bcrypt_cost = 4;
    config.storage.query_timeout_ms = 1_000;
    config
}

/// A running server on an ephemeral port. Shuts down on drop.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub models: Models,
    shutdown: Shutdown,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_app(config: AppConfig) -> TestApp {
    let models = Models::in_memory(config.storage.query_timeout());
    spawn_with_models(config, models).await
}

pub async fn spawn_with_models(config: AppConfig, models: Models) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::with_models(config, models.clone());
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestApp {
        addr,
        client: reqwest::Client::new(),
        models,
        shutdown,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a user directly, bypassing registration.
    pub async fn seed_user(&self, email: &str, activated: bool, permissions: &[&str]) -> i64 {
        let password = Password::hash(PASSWORD, 4).unwrap();
        let mut user = User::new("Test User", email, password);
        user.activated = activated;
        let user = self.models.insert_user(user).await.unwrap();
        self.models
            .add_permissions_for_user(user.id, permissions)
            .await
            .unwrap();
        user.id
    }

    pub async fn issue_token(&self, user_id: i64, scope: Scope, ttl: Duration) -> String {
        let token = Token::generate(user_id, ttl, scope);
        self.models.insert_token(&token).await.unwrap();
        token.plaintext
    }

    /// A bearer token for a freshly seeded user.
    pub async fn bearer(&self, activated: bool, permissions: &[&str]) -> String {
        let email = format!("user{}@example.com", rand_suffix());
        let id = self.seed_user(&email, activated, permissions).await;
        self.issue_token(id, Scope::Authentication, Duration::from_secs(3600))
            .await
    }

    pub async fn seed_movie(&self, title: &str) -> Movie {
        let movie = Movie::new(title, 1999, Runtime(136), vec!["sci-fi".into(), "action".into()]);
        self.models.insert_movie(movie).await.unwrap()
    }
}

fn rand_suffix() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::SeqCst)
}

pub async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.unwrap()
}
