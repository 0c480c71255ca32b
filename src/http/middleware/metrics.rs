//! Request counters and latency.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::observability::metrics;

struct InFlight;

impl InFlight {
    fn start() -> Self {
        metrics::request_started();
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics::request_finished();
    }
}

pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let _in_flight = InFlight::start();

    let response = next.run(request).await;

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
