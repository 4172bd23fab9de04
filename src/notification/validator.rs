//! Request validation. Everything here runs before any network effect.

use std::collections::HashMap;

use crate::error::{AppError, Result};

use super::media::{plan_media, MediaPlan};
use super::preset::{resolve_content, ResolvedContent};
use super::service_config::ServiceConfig;
use super::targets::resolve_targets;
use super::NotificationRequest;

/// A request that passed every check and is ready to stage and send.
#[derive(Debug)]
pub struct ValidatedRequest {
    pub content: ResolvedContent,
    pub data: HashMap<String, String>,
    pub media: MediaPlan,
    pub targets: Vec<String>,
}

/// Check a request against a configuration snapshot.
pub fn validate(request: NotificationRequest, config: &ServiceConfig) -> Result<ValidatedRequest> {
    let content = resolve_content(&request, &config.presets, config.enforce_preset)?;

    let media = plan_media(content.image_url.clone(), request.media)?;
    if media.requires_storage() && (config.storage.is_none() || config.storage_bucket.is_none()) {
        return Err(AppError::validation(
            "media upload requires storage to be configured",
        ));
    }

    let targets = resolve_targets(&config.default_targets, &request.target_override)?;

    Ok(ValidatedRequest {
        content,
        data: request.data,
        media,
        targets,
    })
}
