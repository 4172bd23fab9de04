//! Wire shape of a send request and its conversion into a core request.

use std::collections::HashMap;

use serde::Deserialize;

use crate::notification::{MediaBinary, NotificationRequest, TargetSpec};
use crate::template::stringify_value;

/// Fields accepted by the `send` command.
///
/// `data` and `template_vars` values may be any JSON scalar; they are
/// stringified here so the pipeline only ever sees string maps.
#[derive(Debug, Default, Deserialize)]
pub struct SendFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub media_base64: Option<String>,
    #[serde(default)]
    pub media_mime_type: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub template_vars: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub fcm_tokens: Option<TargetSpec>,
}

fn stringify_map(map: HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(key, value)| (key, stringify_value(&value)))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SendFields {
    pub fn into_request(self) -> NotificationRequest {
        let media = non_empty(self.media_base64)
            .map(|encoded| MediaBinary::base64(encoded, self.media_mime_type));

        NotificationRequest {
            title: non_empty(self.title),
            body: non_empty(self.body),
            image_url: non_empty(self.image_url),
            media,
            data: stringify_map(self.data),
            preset: non_empty(self.preset),
            template_vars: stringify_map(self.template_vars),
            target_override: self
                .fcm_tokens
                .map(TargetSpec::into_targets)
                .unwrap_or_default(),
        }
    }
}

/// Envelope for `POST /api/v1/command`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(flatten)]
    pub fields: SendFields,
}
