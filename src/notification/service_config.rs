//! Immutable configuration snapshot used by one send request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{FirebaseConfig, ServiceAccountSource};
use crate::error::{AppError, Result};
use crate::provider::{
    BlobStorage, FcmClient, GcsStorage, MessagingProvider, ServiceAccountTokenProvider,
    TokenProvider, UrlSigner,
};

use super::dispatcher::{DispatchOptions, DEFAULT_MAX_CONCURRENT_SENDS};
use super::{preset_key, PresetDefinition, TargetSpec};

/// Everything the pipeline needs, fixed for the lifetime of a request.
#[derive(Clone)]
pub struct ServiceConfig {
    pub provider: Arc<dyn MessagingProvider>,
    pub storage: Option<Arc<dyn BlobStorage>>,
    pub default_targets: Vec<String>,
    pub presets: HashMap<String, PresetDefinition>,
    pub enforce_preset: bool,
    pub storage_bucket: Option<String>,
    pub max_concurrent_sends: usize,
    pub log_raw_targets: bool,
}

impl ServiceConfig {
    /// Config with a provider and nothing else; used by tests and embedders.
    pub fn new(provider: Arc<dyn MessagingProvider>) -> Self {
        Self {
            provider,
            storage: None,
            default_targets: Vec::new(),
            presets: HashMap::new(),
            enforce_preset: false,
            storage_bucket: None,
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
            log_raw_targets: false,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn BlobStorage>, bucket: impl Into<String>) -> Self {
        self.storage = Some(storage);
        self.storage_bucket = Some(bucket.into());
        self
    }

    pub fn with_default_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_preset(mut self, mut preset: PresetDefinition) -> Self {
        preset.name = preset_key(&preset.name);
        self.presets.insert(preset.name.clone(), preset);
        self
    }

    pub fn with_enforce_preset(mut self, enforce: bool) -> Self {
        self.enforce_preset = enforce;
        self
    }

    pub fn with_max_concurrent_sends(mut self, max: usize) -> Self {
        self.max_concurrent_sends = max;
        self
    }

    pub fn with_log_raw_targets(mut self, consent: bool) -> Self {
        self.log_raw_targets = consent;
        self
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            max_concurrent_sends: self.max_concurrent_sends,
            log_raw_targets: self.log_raw_targets,
        }
    }

    /// Build live Google clients from configuration.
    ///
    /// Credentials are loaded and parsed here, so a bad service account is
    /// reported at startup (or reload) instead of on the first send.
    pub fn from_settings(firebase: &FirebaseConfig) -> Result<Self> {
        let source = ServiceAccountSource::from_config(
            firebase.service_account_json.as_ref(),
            firebase.service_account_file.as_deref(),
        )?;
        let key = source.load()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let tokens: Arc<dyn TokenProvider> =
            Arc::new(ServiceAccountTokenProvider::new(&key, http.clone())?);

        let provider = FcmClient::with_endpoint(
            key.project_id.clone(),
            Arc::clone(&tokens),
            firebase.fcm_endpoint.clone(),
            http.clone(),
        )
        .validate_only(firebase.validate_only);

        let storage = GcsStorage::with_endpoint(
            tokens,
            UrlSigner::new(&key)?,
            Duration::from_secs(firebase.signed_url_ttl_seconds),
            firebase.storage_endpoint.clone(),
            http,
        );

        let bucket = firebase
            .storage_bucket
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| key.default_bucket());

        let default_targets = firebase
            .fcm_tokens
            .clone()
            .map(TargetSpec::into_configured_targets)
            .unwrap_or_default();
        if default_targets.is_empty() {
            tracing::warn!("No default fcm_tokens configured; every request must name its targets");
        }

        let presets = match firebase.preset_messages.clone() {
            Some(source) => source.into_presets()?,
            None => HashMap::new(),
        };
        if firebase.enforce_preset && presets.is_empty() {
            tracing::warn!("enforce_preset is on but no presets are configured");
        }

        tracing::info!(
            project_id = %key.project_id,
            default_targets = default_targets.len(),
            presets = presets.len(),
            enforce_preset = firebase.enforce_preset,
            validate_only = firebase.validate_only,
            bucket = %bucket,
            "Loaded push configuration"
        );

        Ok(Self {
            provider: Arc::new(provider),
            storage: Some(Arc::new(storage)),
            default_targets,
            presets,
            enforce_preset: firebase.enforce_preset,
            storage_bucket: Some(bucket),
            max_concurrent_sends: firebase.max_concurrent_sends,
            log_raw_targets: firebase.log_raw_targets,
        })
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("provider", &self.provider.name())
            .field("storage", &self.storage.is_some())
            .field("default_targets", &self.default_targets.len())
            .field("presets", &self.presets.keys().collect::<Vec<_>>())
            .field("enforce_preset", &self.enforce_preset)
            .field("storage_bucket", &self.storage_bucket)
            .field("max_concurrent_sends", &self.max_concurrent_sends)
            .field("log_raw_targets", &self.log_raw_targets)
            .finish()
    }
}
