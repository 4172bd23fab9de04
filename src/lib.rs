pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Core
pub mod notification;
pub mod provider;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;
