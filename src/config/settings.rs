use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::notification::{preset_key, PresetDefinition, TargetSpec};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for request bodies; media arrives base64-encoded inline
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
}

/// Firebase push settings as they appear in configuration.
///
/// Several fields accept more than one shape; they are normalized once by
/// the service loader and never inspected again.
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseConfig {
    /// Service account as JSON text or an inline object
    #[serde(default)]
    pub service_account_json: Option<serde_json::Value>,
    /// Path to a service-account JSON file
    #[serde(default)]
    pub service_account_file: Option<PathBuf>,
    /// Default recipients: a token, a JSON array encoded as text, or a list
    #[serde(default)]
    pub fcm_tokens: Option<TargetSpec>,
    /// Named presets, as a mapping or as JSON text
    #[serde(default)]
    pub preset_messages: Option<PresetSource>,
    #[serde(default)]
    pub enforce_preset: bool,
    /// Bucket for staged media; defaults to `<project_id>.appspot.com`
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_seconds: u64,
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    /// Ask FCM to validate without delivering
    #[serde(default)]
    pub validate_only: bool,
    /// Consent to echo raw recipient tokens in logs and outcomes
    #[serde(default)]
    pub log_raw_targets: bool,
    #[serde(default = "default_fcm_endpoint")]
    pub fcm_endpoint: String,
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,
}

/// Presets supplied either as a mapping or as a JSON-encoded mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PresetSource {
    Map(HashMap<String, PresetDefinition>),
    Json(String),
}

impl PresetSource {
    /// Resolve to a name-keyed mapping whose entries carry their own name.
    ///
    /// Keys are folded to lowercase for both shapes; the mapping form arrives
    /// lowercased from the config loader already.
    pub fn into_presets(self) -> Result<HashMap<String, PresetDefinition>, ConfigError> {
        let map = match self {
            PresetSource::Map(map) => map,
            PresetSource::Json(text) if text.trim().is_empty() => HashMap::new(),
            PresetSource::Json(text) => serde_json::from_str(&text).map_err(|e| {
                ConfigError::Message(format!("preset_messages is not valid JSON: {}", e))
            })?,
        };

        Ok(map
            .into_iter()
            .map(|(name, mut preset)| {
                let key = preset_key(&name);
                preset.name = key.clone();
                (key, preset)
            })
            .collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_signed_url_ttl() -> u64 {
    3600 // 1 hour
}

fn default_max_concurrent_sends() -> usize {
    100
}

fn default_fcm_endpoint() -> String {
    crate::provider::DEFAULT_FCM_ENDPOINT.to_string()
}

fn default_storage_endpoint() -> String {
    crate::provider::DEFAULT_STORAGE_ENDPOINT.to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "firebase-push-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PUSH__SERVER__PORT, PUSH__FIREBASE__ENFORCE_PRESET, ...
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Parse settings from a JSON document (tests, embedded configs).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?
            .try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            cors_origins: vec![],
        }
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            service_account_json: None,
            service_account_file: None,
            fcm_tokens: None,
            preset_messages: None,
            enforce_preset: false,
            storage_bucket: None,
            signed_url_ttl_seconds: default_signed_url_ttl(),
            max_concurrent_sends: default_max_concurrent_sends(),
            validate_only: false,
            log_raw_targets: false,
            fcm_endpoint: default_fcm_endpoint(),
            storage_endpoint: default_storage_endpoint(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);

        let firebase = FirebaseConfig::default();
        assert!(!firebase.enforce_preset);
        assert_eq!(firebase.signed_url_ttl_seconds, 3600);
        assert_eq!(firebase.max_concurrent_sends, 100);
    }

    #[test]
    fn test_from_json_with_preset_map() {
        let settings = Settings::from_json(
            r#"{
                "server": { "port": 9000 },
                "firebase": {
                    "service_account_file": "/etc/push/sa.json",
                    "fcm_tokens": ["T1", "T2"],
                    "enforce_preset": true,
                    "preset_messages": {
                        "alert": { "title": "Alert: <<alert_type>>", "body": "About <<alert_details>>." }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.server_addr(), "0.0.0.0:9000");
        assert!(settings.firebase.enforce_preset);

        let presets = settings.firebase.preset_messages.unwrap().into_presets().unwrap();
        assert_eq!(presets["alert"].name, "alert");
        assert_eq!(presets["alert"].title, "Alert: <<alert_type>>");
        assert!(presets["alert"].image_url.is_none());
    }

    #[test]
    fn test_presets_as_json_text() {
        let source = PresetSource::Json(
            r#"{"door": {"title": "Door", "body": "Opened", "image_url": "https://x/<<cam>>.jpg"}}"#
                .to_string(),
        );
        let presets = source.into_presets().unwrap();
        assert_eq!(presets["door"].image_url.as_deref(), Some("https://x/<<cam>>.jpg"));
    }

    #[test]
    fn test_preset_names_fold_to_lowercase() {
        let settings = Settings::from_json(
            r#"{"firebase": {"preset_messages": {"DoorOpen": {"title": "Door", "body": "Opened"}}}}"#,
        )
        .unwrap();
        let presets = settings.firebase.preset_messages.unwrap().into_presets().unwrap();
        assert_eq!(presets.keys().collect::<Vec<_>>(), vec!["dooropen"]);
        assert_eq!(presets["dooropen"].name, "dooropen");

        let source = PresetSource::Json(r#"{"DoorOpen": {"title": "Door"}}"#.to_string());
        let presets = source.into_presets().unwrap();
        assert!(presets.contains_key("dooropen"));
    }

    #[test]
    fn test_presets_invalid_json_text() {
        let source = PresetSource::Json("{not json".to_string());
        assert!(source.into_presets().is_err());
    }

    #[test]
    fn test_empty_preset_text() {
        let source = PresetSource::Json("  ".to_string());
        assert!(source.into_presets().unwrap().is_empty());
    }
}
