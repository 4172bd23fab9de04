//! Runtime reconfiguration.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::Settings;
use crate::error::Result;
use crate::notification::ServiceConfig;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub default_targets: usize,
    pub presets: usize,
}

/// POST /api/v1/admin/reload - re-read configuration and swap it in.
///
/// A configuration that fails to load leaves the current one in place.
#[tracing::instrument(name = "http.reload_config", skip(state))]
pub async fn reload_config(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let settings = Settings::new()?;
    let config = ServiceConfig::from_settings(&settings.firebase)?;

    let response = ReloadResponse {
        reloaded: true,
        default_targets: config.default_targets.len(),
        presets: config.presets.len(),
    };
    state.push.reconfigure(config);

    Ok(Json(response))
}
