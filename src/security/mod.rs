//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 when spent)
//!     → panic isolation, CORS, authentication (http/middleware)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Limiting runs before authentication so credential lookups are throttled too
//! - Proxy headers are only trusted when configured

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, Admission, RateLimiter};
