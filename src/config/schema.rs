//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the catalog service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener and request handling.
    pub server: ServerConfig,

    /// Per-client request throttling.
    pub rate_limit: RateLimitConfig,

    /// Storage call deadlines.
    pub storage: StorageConfig,

    /// Credential lifetimes and password hashing.
    pub auth: AuthConfig,

    /// Cross-origin request settings.
    pub cors: CorsConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,

    /// Deployment environment (development, staging, production).
    pub environment: String,

    /// Total time allowed for a request/response in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            environment: "development".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1_048_576,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Bucket refill rate per client.
    pub requests_per_second: f64,

    /// Burst capacity.
    pub burst_size: u32,

    /// How often idle clients are swept, in seconds.
    pub sweep_interval_secs: u64,

    /// Clients unseen for longer than this are forgotten, in seconds.
    pub idle_timeout_secs: u64,

    /// Key clients by X-Forwarded-For / X-Real-IP instead of the peer address.
    /// Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst_size: 4,
            sweep_interval_secs: 60,
            idle_timeout_secs: 180,
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Deadline for a single storage call in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 3_000,
        }
    }
}

impl StorageConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of authentication tokens in seconds.
    pub token_ttl_secs: u64,

    /// Lifetime of activation tokens in seconds.
    pub activation_ttl_secs: u64,

    /// bcrypt work factor for password hashes.
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 24 * 60 * 60,
            activation_ttl_secs: 3 * 24 * 60 * 60,
            bcrypt_cost: 12,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn activation_ttl(&self) -> Duration {
        Duration::from_secs(self.activation_ttl_secs)
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to make cross-origin requests. Empty disables CORS.
    pub trusted_origins: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for log shippers.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [rate_limit]
            requests_per_second = 10.0

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.requests_per_second, 10.0);
        assert_eq!(config.rate_limit.burst_size, 4);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.server.bind_address, "0.0.0.0:4000");
        assert_eq!(config.auth.token_ttl(), Duration::from_secs(86_400));
    }
}
