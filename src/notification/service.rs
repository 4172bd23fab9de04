//! The send pipeline: validate, stage media, dispatch, release.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::{AppError, Result};
use crate::metrics::RequestMetrics;

use super::dispatcher::{DispatcherStatsSnapshot, NotificationDispatcher};
use super::media::stage_media;
use super::service_config::ServiceConfig;
use super::validator::validate;
use super::{DispatchSummary, NotificationRequest, ResolvedNotification};

/// Push service holding the current configuration snapshot.
///
/// Each request loads the snapshot once and uses it to completion, so a
/// concurrent [`reconfigure`](Self::reconfigure) never affects a request
/// that already started.
pub struct PushService {
    config: ArcSwap<ServiceConfig>,
    dispatcher: NotificationDispatcher,
}

impl PushService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            dispatcher: NotificationDispatcher::new(),
        }
    }

    /// The configuration new requests will see.
    pub fn snapshot(&self) -> Arc<ServiceConfig> {
        self.config.load_full()
    }

    /// Replace the whole configuration.
    pub fn reconfigure(&self, config: ServiceConfig) {
        tracing::info!(
            default_targets = config.default_targets.len(),
            presets = config.presets.len(),
            "Swapping push configuration"
        );
        self.config.store(Arc::new(config));
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.dispatcher.stats()
    }

    /// Run one request to completion.
    ///
    /// Returns an error only when nothing was sent: a validation failure or
    /// a failed media upload. Per-target failures are in the summary.
    #[tracing::instrument(
        name = "push.send",
        skip(self, request),
        fields(preset = ?request.preset, overrides = request.target_override.len())
    )]
    pub async fn send(&self, request: NotificationRequest) -> Result<DispatchSummary> {
        let in_flight = RequestMetrics::in_flight();
        let config = self.snapshot();
        let result = self.run(request, &config).await;
        drop(in_flight);

        match &result {
            Ok(summary) => {
                RequestMetrics::record_ok();
                tracing::info!(
                    sent = summary.sent_count,
                    failed = summary.failed_count,
                    total = summary.total_targets,
                    warnings = summary.warnings.len(),
                    "Push request completed"
                );
            }
            Err(AppError::Storage(e)) => {
                RequestMetrics::record_storage_error();
                tracing::warn!(error = %e, "Push request aborted, media upload failed");
            }
            Err(e) => {
                RequestMetrics::record_validation_error();
                tracing::info!(error = %e, "Push request rejected");
            }
        }

        result
    }

    /// Run [`send`](Self::send) on its own task.
    ///
    /// Dropping the returned future does not cancel the pipeline: issued
    /// sends finish and staged media is still released.
    pub async fn send_detached(self: &Arc<Self>, request: NotificationRequest) -> Result<DispatchSummary> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.send(request).await })
            .await
            .map_err(|e| AppError::Internal(format!("send task failed: {}", e)))?
    }

    async fn run(&self, request: NotificationRequest, config: &ServiceConfig) -> Result<DispatchSummary> {
        let validated = validate(request, config)?;

        let bucket = config.storage_bucket.as_deref().unwrap_or_default();
        let media = stage_media(validated.media, config.storage.as_ref(), bucket).await?;

        let notification = ResolvedNotification {
            title: validated.content.title,
            body: validated.content.body,
            image_url: media.image_url,
            data: validated.data,
        };

        let mut summary = self
            .dispatcher
            .dispatch(
                &config.provider,
                &notification,
                &validated.targets,
                config.dispatch_options(),
            )
            .await;

        if let Some(staged) = media.staged {
            if let Some(warning) = staged.release().await {
                summary.warnings.push(warning);
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MediaBinary, PresetDefinition};
    use crate::provider::{MockBlobStorage, MockMessagingProvider};

    fn alert() -> PresetDefinition {
        PresetDefinition {
            name: "alert".to_string(),
            title: "Alert: <<alert_type>>".to_string(),
            body: "This is an alert about <<alert_details>>.".to_string(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_send_direct_to_defaults() {
        let provider = Arc::new(MockMessagingProvider::new());
        let service = PushService::new(
            ServiceConfig::new(provider.clone()).with_default_targets(["T1", "T2"]),
        );

        let summary = service
            .send(NotificationRequest::direct("Hello", "Test"))
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(summary.sent_count, 2);
        assert_eq!(summary.total_targets, 2);
        assert_eq!(provider.attempts(), 2);
    }

    #[tokio::test]
    async fn test_preset_with_override() {
        let provider = Arc::new(MockMessagingProvider::new());
        let service = PushService::new(
            ServiceConfig::new(provider.clone())
                .with_default_targets(["T1", "T2"])
                .with_preset(alert()),
        );

        let request = NotificationRequest::preset("alert")
            .var("alert_type", "Motion")
            .var("alert_details", "Kitchen")
            .targets(["T3"]);
        let summary = service.send(request).await.unwrap();

        assert_eq!(summary.total_targets, 1);
        let sent = provider.sent().await;
        assert_eq!(sent[0].0, "T3");
        assert_eq!(sent[0].1.title, "Alert: Motion");
        assert_eq!(sent[0].1.body, "This is an alert about Kitchen.");
    }

    #[tokio::test]
    async fn test_validation_error_sends_nothing() {
        let provider = Arc::new(MockMessagingProvider::new());
        let service = PushService::new(
            ServiceConfig::new(provider.clone())
                .with_default_targets(["T1"])
                .with_enforce_preset(true),
        );

        let err = service
            .send(NotificationRequest::direct("Hello", "Test"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == "preset required"));
        assert_eq!(provider.attempts(), 0);
    }

    #[tokio::test]
    async fn test_media_deleted_once_after_partial_failure() {
        let provider = Arc::new(MockMessagingProvider::failing(["T2"]));
        let storage = Arc::new(MockBlobStorage::new());
        let service = PushService::new(
            ServiceConfig::new(provider.clone())
                .with_storage(storage.clone(), "bucket")
                .with_default_targets(["T1", "T2"]),
        );

        let request = NotificationRequest::direct("Hello", "Test")
            .image_url("https://img.example/raw.png")
            .media(MediaBinary::new(b"png".to_vec(), "image/png"));
        let summary = service.send(request).await.unwrap();

        assert_eq!(summary.sent_count, 1);
        assert_eq!(summary.failed_count, 1);

        let uploads = storage.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(storage.deletes().await.len(), 1);

        let sent = provider.sent().await;
        assert_eq!(
            sent[0].1.image_url.as_deref(),
            Some(uploads[0].0.signed_url.as_str())
        );
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_request() {
        let provider = Arc::new(MockMessagingProvider::new());
        let service = PushService::new(
            ServiceConfig::new(provider.clone())
                .with_storage(Arc::new(MockBlobStorage::failing_upload()), "bucket")
                .with_default_targets(["T1"]),
        );

        let request = NotificationRequest::direct("Hello", "Test")
            .media(MediaBinary::new(b"png".to_vec(), "image/png"));
        let err = service.send(request).await.unwrap_err();

        assert!(err.is_validation_class());
        assert_eq!(provider.attempts(), 0);
    }

    #[tokio::test]
    async fn test_reconfigure_swaps_snapshot() {
        let service = PushService::new(
            ServiceConfig::new(Arc::new(MockMessagingProvider::new())).with_default_targets(["T1"]),
        );
        let before = service.snapshot();

        service.reconfigure(
            ServiceConfig::new(Arc::new(MockMessagingProvider::new()))
                .with_default_targets(["T1", "T2", "T3"]),
        );

        assert_eq!(before.default_targets.len(), 1);
        assert_eq!(service.snapshot().default_targets.len(), 3);
    }
}
