use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};
use crate::triggers::{do_command, send_notification};

use super::admin::reload_config;
use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Push endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route("/command", post(do_command))
                .route("/notifications/send", post(send_notification))
                .route("/admin/reload", post(reload_config))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
