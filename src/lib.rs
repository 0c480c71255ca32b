//! Movie catalog JSON API.
//!
//! A versioned REST service over a movie catalog with user registration,
//! account activation, bearer-token authentication and permission-based
//! authorization, fronted by per-client rate limiting.

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::AppConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
