//! Final image reference for a notification.
//!
//! A binary always beats a URL. Binaries are staged in blob storage and
//! the staged object is released exactly once after the dispatch attempt.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::metrics::MediaMetrics;
use crate::provider::{BlobStorage, UploadedObject};

use super::MediaBinary;

/// What to do about the image before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPlan {
    None,
    /// Use this URL unchanged
    Url(String),
    /// Upload these bytes and use the signed URL
    Upload { bytes: Vec<u8>, mime_type: String },
}

impl MediaPlan {
    pub fn requires_storage(&self) -> bool {
        matches!(self, MediaPlan::Upload { .. })
    }
}

/// Decide the media handling for a request. Performs no I/O.
pub fn plan_media(image_url: Option<String>, media: Option<MediaBinary>) -> Result<MediaPlan> {
    if let Some(media) = media {
        let mime_type = media
            .mime_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AppError::validation("media_mime_type required"))?;

        let bytes = media.bytes.decode()?;
        if bytes.is_empty() {
            return Err(AppError::validation("media_base64 is empty"));
        }

        if image_url.is_some() {
            tracing::debug!("Binary media supplied, ignoring image_url");
        }

        return Ok(MediaPlan::Upload { bytes, mime_type });
    }

    Ok(match image_url {
        Some(url) if !url.is_empty() => MediaPlan::Url(url),
        _ => MediaPlan::None,
    })
}

/// An uploaded object that must be deleted once the send attempt is over.
#[must_use = "staged media must be released after dispatch"]
pub struct StagedMedia {
    object: UploadedObject,
    storage: Arc<dyn BlobStorage>,
}

impl StagedMedia {
    pub fn url(&self) -> &str {
        &self.object.signed_url
    }

    pub fn object(&self) -> &UploadedObject {
        &self.object
    }

    /// Delete the staged object. A failure is returned as a warning message
    /// instead of an error so it can never replace the send outcome.
    pub async fn release(self) -> Option<String> {
        match self.storage.delete(&self.object).await {
            Ok(()) => {
                tracing::debug!(object_id = %self.object.object_id, "Deleted staged media");
                None
            }
            Err(e) => {
                MediaMetrics::record_cleanup_failure();
                tracing::warn!(
                    object_id = %self.object.object_id,
                    bucket = %self.object.bucket,
                    error = %e,
                    "Failed to delete staged media"
                );
                Some(format!(
                    "failed to delete staged media {}: {}",
                    self.object.object_id, e
                ))
            }
        }
    }
}

/// The image reference to embed, plus the staged object to clean up later.
pub struct MediaResolution {
    pub image_url: Option<String>,
    pub staged: Option<StagedMedia>,
}

/// Carry out a plan, uploading when needed.
#[tracing::instrument(name = "media.stage", skip(plan, storage))]
pub async fn stage_media(
    plan: MediaPlan,
    storage: Option<&Arc<dyn BlobStorage>>,
    bucket: &str,
) -> Result<MediaResolution> {
    match plan {
        MediaPlan::None => Ok(MediaResolution {
            image_url: None,
            staged: None,
        }),
        MediaPlan::Url(url) => Ok(MediaResolution {
            image_url: Some(url),
            staged: None,
        }),
        MediaPlan::Upload { bytes, mime_type } => {
            let storage = storage
                .ok_or_else(|| AppError::validation("media upload requires storage to be configured"))?;

            let object = storage.upload(&bytes, &mime_type, bucket).await?;
            MediaMetrics::record_staged();
            tracing::debug!(
                object_id = %object.object_id,
                size = bytes.len(),
                mime_type = %mime_type,
                "Staged media"
            );

            let staged = StagedMedia {
                object,
                storage: Arc::clone(storage),
            };
            Ok(MediaResolution {
                image_url: Some(staged.url().to_string()),
                staged: Some(staged),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockBlobStorage;

    #[test]
    fn test_binary_wins_over_url() {
        let plan = plan_media(
            Some("https://img.example/a.png".to_string()),
            Some(MediaBinary::new(vec![1, 2, 3], "image/png")),
        )
        .unwrap();
        assert!(matches!(plan, MediaPlan::Upload { ref mime_type, .. } if mime_type == "image/png"));
    }

    #[test]
    fn test_missing_mime_type() {
        let media = MediaBinary::base64("aGVsbG8=", None);
        match plan_media(None, Some(media)) {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "media_mime_type required"),
            _ => panic!("expected validation error"),
        }

        let media = MediaBinary::base64("aGVsbG8=", Some("  ".to_string()));
        assert!(plan_media(None, Some(media)).is_err());
    }

    #[test]
    fn test_url_only_and_none() {
        assert_eq!(
            plan_media(Some("https://x/y.png".to_string()), None).unwrap(),
            MediaPlan::Url("https://x/y.png".to_string())
        );
        assert_eq!(plan_media(None, None).unwrap(), MediaPlan::None);
        assert_eq!(plan_media(Some(String::new()), None).unwrap(), MediaPlan::None);
    }

    #[test]
    fn test_invalid_and_empty_base64() {
        let bad = MediaBinary::base64("not base64!", Some("image/png".to_string()));
        assert!(plan_media(None, Some(bad)).is_err());

        let empty = MediaBinary::base64("", Some("image/png".to_string()));
        assert!(plan_media(None, Some(empty)).is_err());
    }

    #[tokio::test]
    async fn test_stage_and_release() {
        let mock = Arc::new(MockBlobStorage::new());
        let storage: Arc<dyn BlobStorage> = mock.clone();

        let plan = MediaPlan::Upload {
            bytes: b"img".to_vec(),
            mime_type: "image/png".to_string(),
        };
        let resolution = stage_media(plan, Some(&storage), "bucket").await.unwrap();
        let staged = resolution.staged.unwrap();
        assert_eq!(resolution.image_url.as_deref(), Some(staged.url()));

        assert!(staged.release().await.is_none());
        assert_eq!(mock.deletes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_release_failure_is_warning() {
        let mock = Arc::new(MockBlobStorage::failing_delete());
        let storage: Arc<dyn BlobStorage> = mock.clone();

        let plan = MediaPlan::Upload {
            bytes: b"img".to_vec(),
            mime_type: "image/png".to_string(),
        };
        let staged = stage_media(plan, Some(&storage), "bucket")
            .await
            .unwrap()
            .staged
            .unwrap();

        let warning = staged.release().await.unwrap();
        assert!(warning.contains("failed to delete staged media"));
    }

    #[tokio::test]
    async fn test_upload_failure_is_storage_error() {
        let storage: Arc<dyn BlobStorage> = Arc::new(MockBlobStorage::failing_upload());
        let plan = MediaPlan::Upload {
            bytes: b"img".to_vec(),
            mime_type: "image/png".to_string(),
        };
        let err = stage_media(plan, Some(&storage), "bucket").await.err().unwrap();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_url_plan_touches_no_storage() {
        let mock = Arc::new(MockBlobStorage::new());
        let storage: Arc<dyn BlobStorage> = mock.clone();

        let resolution = stage_media(MediaPlan::Url("https://x".to_string()), Some(&storage), "b")
            .await
            .unwrap();
        assert_eq!(resolution.image_url.as_deref(), Some("https://x"));
        assert!(resolution.staged.is_none());
        assert!(mock.uploads().await.is_empty());
    }
}
