use std::collections::HashMap;

use base64::Engine;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Raw media bytes, or the base64 text they arrived as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaBytes {
    Raw(Vec<u8>),
    Base64(String),
}

impl MediaBytes {
    pub fn decode(self) -> Result<Vec<u8>> {
        match self {
            MediaBytes::Raw(bytes) => Ok(bytes),
            MediaBytes::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|_| AppError::validation("media_base64 is not valid base64")),
        }
    }
}

/// A binary image supplied with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBinary {
    pub bytes: MediaBytes,
    pub mime_type: Option<String>,
}

impl MediaBinary {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: MediaBytes::Raw(bytes),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn base64(text: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            bytes: MediaBytes::Base64(text.into()),
            mime_type,
        }
    }
}

/// A logical notification request, before any resolution.
#[derive(Debug, Clone, Default)]
pub struct NotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub media: Option<MediaBinary>,
    pub data: HashMap<String, String>,
    pub preset: Option<String>,
    pub template_vars: HashMap<String, String>,
    /// Replaces the configured default targets when non-empty
    pub target_override: Vec<String>,
}

impl NotificationRequest {
    /// Request with explicit title and body
    pub fn direct(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Request driven by a named preset
    pub fn preset(name: impl Into<String>) -> Self {
        Self {
            preset: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_vars.insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn media(mut self, media: MediaBinary) -> Self {
        self.media = Some(media);
        self
    }

    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_override = targets.into_iter().map(Into::into).collect();
        self
    }
}

/// The fully materialized payload shared by every target of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub data: HashMap<String, String>,
}

/// Result of delivering to a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// Position of the target in the resolved target list
    pub index: usize,
    /// Raw recipient token, only present with explicit consent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// True iff at least one target was reached
    pub success: bool,
    pub sent_count: usize,
    pub failed_count: usize,
    pub total_targets: usize,
    pub outcomes: Vec<DispatchOutcome>,
    /// Non-fatal problems, e.g. a staged image that could not be deleted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DispatchSummary {
    pub fn from_outcomes(outcomes: Vec<DispatchOutcome>) -> Self {
        let total_targets = outcomes.len();
        let sent_count = outcomes.iter().filter(|o| o.success).count();

        Self {
            success: sent_count > 0,
            sent_count,
            failed_count: total_targets - sent_count,
            total_targets,
            outcomes,
            warnings: Vec::new(),
        }
    }
}
