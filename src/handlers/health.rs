use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub system_info: SystemInfo,
}

pub async fn healthcheck(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "available",
        system_info: SystemInfo {
            environment: state.config.server.environment.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}
