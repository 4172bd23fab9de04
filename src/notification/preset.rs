//! Preset selection and content resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::template::substitute;

use super::NotificationRequest;

/// A named, pre-configured notification.
///
/// Names are matched case-insensitively; configuration loaders fold mapping
/// keys to lowercase, so every stored key goes through [`preset_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetDefinition {
    /// Filled from the configuration key
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Title, body and image reference chosen for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    /// Name of the preset that supplied the content, if any
    pub preset: Option<String>,
}

/// Canonical lookup key for a preset name.
pub fn preset_key(name: &str) -> String {
    name.to_lowercase()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Choose the content of a request.
///
/// A named preset always wins over explicit title/body; its fields are run
/// through the template engine. Explicit fields are used verbatim.
pub fn resolve_content(
    request: &NotificationRequest,
    presets: &HashMap<String, PresetDefinition>,
    enforce_preset: bool,
) -> Result<ResolvedContent> {
    let preset_name = request.preset.as_deref().filter(|name| !name.is_empty());

    if enforce_preset && preset_name.is_none() {
        return Err(AppError::validation("preset required"));
    }

    if let Some(name) = preset_name {
        let preset = presets.get(&preset_key(name)).ok_or_else(|| {
            tracing::debug!(preset = %name, "Unknown preset requested");
            AppError::validation("unknown preset")
        })?;

        if !is_blank(&request.title) || !is_blank(&request.body) {
            tracing::debug!(preset = %name, "Ignoring explicit title/body in favor of preset");
        }

        let vars = &request.template_vars;
        let title = substitute(&preset.title, vars);
        let body = substitute(&preset.body, vars);
        if title.is_empty() && body.is_empty() {
            tracing::warn!(preset = %name, "Preset has neither title nor body");
            return Err(AppError::validation("preset has no title or body"));
        }

        return Ok(ResolvedContent {
            title,
            body,
            image_url: preset.image_url.as_deref().map(|url| substitute(url, vars)),
            preset: Some(preset_key(name)),
        });
    }

    let has_media = !is_blank(&request.image_url) || request.media.is_some();
    if is_blank(&request.title) && is_blank(&request.body) && !has_media {
        return Err(AppError::validation("title/body or preset required"));
    }

    Ok(ResolvedContent {
        title: request.title.clone().unwrap_or_default(),
        body: request.body.clone().unwrap_or_default(),
        image_url: request.image_url.clone().filter(|url| !url.is_empty()),
        preset: None,
    })
}
