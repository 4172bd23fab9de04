//! Notification resolution and dispatch.
//!
//! A [`NotificationRequest`] flows through the pipeline in a fixed order:
//!
//! 1. content: preset or explicit title/body (`preset`)
//! 2. media: URL or uploaded binary (`media`)
//! 3. recipients: override or configured defaults (`targets`)
//! 4. dispatch: one send per target, failures isolated (`dispatcher`)
//!
//! Steps 1-3 run in [`validate`] before any network effect. [`PushService`]
//! drives the whole pipeline against an immutable [`ServiceConfig`] snapshot.

mod dispatcher;
mod media;
mod preset;
mod service;
mod service_config;
mod targets;
mod types;
mod validator;

pub use dispatcher::{
    DispatchOptions, DispatcherStats, DispatcherStatsSnapshot, NotificationDispatcher,
    DEFAULT_MAX_CONCURRENT_SENDS,
};
pub use media::{plan_media, stage_media, MediaPlan, MediaResolution, StagedMedia};
pub use preset::{preset_key, resolve_content, PresetDefinition, ResolvedContent};
pub use service::PushService;
pub use service_config::ServiceConfig;
pub use targets::{resolve_targets, TargetSpec};
pub use types::{
    DispatchOutcome, DispatchSummary, MediaBinary, MediaBytes, NotificationRequest,
    ResolvedNotification,
};
pub use validator::{validate, ValidatedRequest};
