//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates > 0, timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::AppConfig;

pub const ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

struct Collector(Vec<ValidationError>);

impl Collector {
    fn check(&mut self, ok: bool, field: &'static str, message: impl Into<String>) {
        if !ok {
            self.0.push(ValidationError {
                field,
                message: message.into(),
            });
        }
    }
}

/// Checks every section, collecting all problems.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut c = Collector(Vec::new());

    let server = &config.server;
    c.check(
        server.bind_address.parse::<SocketAddr>().is_ok(),
        "server.bind_address",
        format!("'{}' is not a socket address", server.bind_address),
    );
    c.check(
        ENVIRONMENTS.contains(&server.environment.as_str()),
        "server.environment",
        "must be one of development, staging, production",
    );
    c.check(server.request_timeout_secs > 0, "server.request_timeout_secs", "must be positive");
    c.check(server.max_body_bytes > 0, "server.max_body_bytes", "must be positive");

    let limiter = &config.rate_limit;
    c.check(
        limiter.requests_per_second.is_finite() && limiter.requests_per_second > 0.0,
        "rate_limit.requests_per_second",
        "must be a positive number",
    );
    c.check(limiter.burst_size >= 1, "rate_limit.burst_size", "must be at least 1");
    c.check(limiter.sweep_interval_secs > 0, "rate_limit.sweep_interval_secs", "must be positive");
    c.check(limiter.idle_timeout_secs > 0, "rate_limit.idle_timeout_secs", "must be positive");

    c.check(config.storage.query_timeout_ms > 0, "storage.query_timeout_ms", "must be positive");
    c.check(
        server.request_timeout_secs.saturating_mul(1_000) > config.storage.query_timeout_ms,
        "server.request_timeout_secs",
        "must be longer than storage.query_timeout_ms",
    );

    let auth = &config.auth;
    c.check(auth.token_ttl_secs > 0, "auth.token_ttl_secs", "must be positive");
    c.check(auth.activation_ttl_secs > 0, "auth.activation_ttl_secs", "must be positive");
    c.check(
        BCRYPT_COST_RANGE.contains(&auth.bcrypt_cost),
        "auth.bcrypt_cost",
        format!(
            "must be between {} and {}",
            BCRYPT_COST_RANGE.start(),
            BCRYPT_COST_RANGE.end()
        ),
    );

    for origin in &config.cors.trusted_origins {
        c.check(
            (origin.starts_with("http://") || origin.starts_with("https://"))
                && HeaderValue::from_str(origin).is_ok(),
            "cors.trusted_origins",
            format!("'{}' is not an http(s) origin", origin),
        );
    }

    let observability = &config.observability;
    if observability.metrics_enabled {
        c.check(
            observability.metrics_address.parse::<SocketAddr>().is_ok(),
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        );
    }

    if c.0.is_empty() {
        Ok(())
    } else {
        Err(c.0)
    }
}
