//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub provider: String,
    pub storage_configured: bool,
    pub default_targets: usize,
    pub presets: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub notifications: DispatcherStatsSnapshot,
    pub enforce_preset: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.push.snapshot();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        provider: config.provider.name().to_string(),
        storage_configured: config.storage.is_some(),
        default_targets: config.default_targets.len(),
        presets: config.presets.len(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        notifications: state.push.stats(),
        enforce_preset: state.push.snapshot().enforce_preset,
    })
}
