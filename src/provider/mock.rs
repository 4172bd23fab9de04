//! In-memory collaborators for tests and local runs without Google access.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::notification::ResolvedNotification;

use super::{
    object_name_for, BlobStorage, MessagingProvider, ProviderError, StorageError, TokenProvider,
    UploadedObject,
};

/// Token provider that always returns the same token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ProviderError> {
        Ok(self.token.clone())
    }
}

/// Messaging provider that records every send and fails selected targets.
#[derive(Default)]
pub struct MockMessagingProvider {
    failing_targets: HashSet<String>,
    delay: Option<Duration>,
    sent: Mutex<Vec<(String, ResolvedNotification)>>,
    attempts: AtomicUsize,
}

impl MockMessagingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to any of these targets fail with an `UNREGISTERED` error.
    pub fn failing<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Delay every send, to exercise concurrency and cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Successful sends in completion order.
    pub async fn sent(&self) -> Vec<(String, ResolvedNotification)> {
        self.sent.lock().await.clone()
    }

    /// Number of send attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingProvider for MockMessagingProvider {
    async fn send_to_one(
        &self,
        target: &str,
        notification: &ResolvedNotification,
    ) -> Result<String, ProviderError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_targets.contains(target) {
            return Err(ProviderError::Api {
                status: 404,
                code: "UNREGISTERED".to_string(),
                message: "Requested entity was not found.".to_string(),
            });
        }

        let mut sent = self.sent.lock().await;
        sent.push((target.to_string(), notification.clone()));
        Ok(format!("projects/mock/messages/{}", sent.len()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Blob storage that keeps uploads in memory and counts deletes.
#[derive(Default)]
pub struct MockBlobStorage {
    fail_upload: bool,
    fail_delete: bool,
    uploads: Mutex<Vec<(UploadedObject, Vec<u8>, String)>>,
    deletes: Mutex<Vec<UploadedObject>>,
}

impl MockBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Self::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    /// Uploaded objects with their bytes and MIME type.
    pub async fn uploads(&self) -> Vec<(UploadedObject, Vec<u8>, String)> {
        self.uploads.lock().await.clone()
    }

    /// Every delete attempt, including failed ones.
    pub async fn deletes(&self) -> Vec<UploadedObject> {
        self.deletes.lock().await.clone()
    }
}

#[async_trait]
impl BlobStorage for MockBlobStorage {
    async fn upload(
        &self,
        bytes: &[u8],
        mime_type: &str,
        bucket: &str,
    ) -> Result<UploadedObject, StorageError> {
        if self.fail_upload {
            return Err(StorageError::Upload {
                status: 503,
                message: "storage unavailable".to_string(),
            });
        }

        let object_id = object_name_for(mime_type);
        let object = UploadedObject {
            bucket: bucket.to_string(),
            signed_url: format!("https://storage.example/{}/{}?sig=mock", bucket, object_id),
            object_id,
        };

        self.uploads
            .lock()
            .await
            .push((object.clone(), bytes.to_vec(), mime_type.to_string()));
        Ok(object)
    }

    async fn delete(&self, object: &UploadedObject) -> Result<(), StorageError> {
        self.deletes.lock().await.push(object.clone());

        if self.fail_delete {
            return Err(StorageError::Delete {
                status: 500,
                message: "backend error".to_string(),
            });
        }
        Ok(())
    }
}
