//! API layer - HTTP endpoint handlers organized by domain.

mod admin;
mod health;
mod metrics;
mod routes;

pub use admin::{reload_config, ReloadResponse};
pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
