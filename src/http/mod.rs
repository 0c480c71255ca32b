//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/ (metrics, limits, faults, authentication, guards)
//!     → request.rs (request ID, client address, JSON bodies, ids)
//!     → handlers/
//!     → error.rs envelope on failure
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{ApiJson, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
