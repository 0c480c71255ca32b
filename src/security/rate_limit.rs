//! Per-client rate limiting.
//!
//! Each client address owns a token bucket holding up to `burst_size`
//! tokens, refilled at `requests_per_second`. A request spends one token or
//! is refused with 429. Buckets of clients not seen for `idle_timeout` are
//! dropped by a periodic sweeper so the table cannot grow without bound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::http::request::client_address;
use crate::observability::metrics;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny,
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_update {
            self.last_update = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

struct ClientRecord {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Token buckets keyed by client address.
pub struct RateLimiter {
    clients: Mutex<HashMap<String, ClientRecord>>,
    enabled: bool,
    rps: f64,
    burst: f64,
    idle_timeout: Duration,
    sweep_interval: Duration,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            rps: config.requests_per_second,
            burst: f64::from(config.burst_size),
            idle_timeout: config.idle_timeout(),
            sweep_interval: config.sweep_interval(),
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    pub fn admit(&self, client: &str) -> Admission {
        self.admit_at(client, Instant::now())
    }

    /// Admission check against an explicit clock reading.
    pub fn admit_at(&self, client: &str, now: Instant) -> Admission {
        if !self.enabled {
            return Admission::Allow;
        }

        let mut clients = self.lock();
        let record = clients
            .entry(client.to_string())
            .or_insert_with(|| ClientRecord {
                bucket: TokenBucket::new(self.burst, now),
                last_seen: now,
            });
        if now > record.last_seen {
            record.last_seen = now;
        }

        if record.bucket.try_acquire(self.burst, self.rps, now) {
            Admission::Allow
        } else {
            Admission::Deny
        }
    }

    /// Drop clients idle longer than the timeout. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, record| {
            now.saturating_duration_since(record.last_seen) <= self.idle_timeout
        });
        let removed = before - clients.len();
        metrics::record_tracked_clients(clients.len());
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Run [`sweep`](Self::sweep) every interval until shutdown fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                remaining = limiter.tracked_clients(),
                                "Swept idle rate limit clients"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientRecord>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Middleware refusing clients that have spent their bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.enabled() {
        return next.run(request).await;
    }

    let client = client_address(&request, limiter.trust_proxy_headers());
    match limiter.admit(&client) {
        Admission::Allow => next.run(request).await,
        Admission::Deny => {
            tracing::debug!(client = %client, "Rate limit exceeded");
            metrics::record_rate_limited();
            ApiError::RateLimited.into_response()
        }
    }
}
