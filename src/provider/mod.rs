//! External collaborators of the dispatch pipeline.
//!
//! The pipeline only talks to three narrow traits:
//!
//! - [`MessagingProvider`]: deliver one notification to one device token
//! - [`BlobStorage`]: stage a binary and hand back a signed URL, then delete it
//! - [`TokenProvider`]: mint OAuth2 access tokens for the two clients above
//!
//! Production implementations talk to Firebase Cloud Messaging (HTTP v1)
//! and Cloud Storage; `mock` holds in-memory doubles.

mod auth;
mod fcm;
mod gcs;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::notification::ResolvedNotification;

pub use auth::{ServiceAccountTokenProvider, GOOGLE_SCOPES};
pub use fcm::{FcmClient, FcmMessage, FcmRequest, DEFAULT_FCM_ENDPOINT};
pub use gcs::{object_name_for, GcsStorage, UrlSigner, DEFAULT_STORAGE_ENDPOINT};
pub use mock::{MockBlobStorage, MockMessagingProvider, StaticTokenProvider};

/// Errors returned by the messaging provider for a single send.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status
    #[error("Provider rejected message ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Obtaining an access token failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Short machine-readable reason for metrics and outcomes.
    pub fn code(&self) -> &str {
        match self {
            ProviderError::Network(_) => "NETWORK",
            ProviderError::Api { code, .. } => code.as_str(),
            ProviderError::Auth(_) => "AUTH",
            ProviderError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }
}

/// Errors returned by blob storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload rejected ({status}): {message}")]
    Upload { status: u16, message: String },

    #[error("delete rejected ({status}): {message}")]
    Delete { status: u16, message: String },

    #[error("storage network error: {0}")]
    Network(String),

    #[error("storage authentication failed: {0}")]
    Auth(String),

    #[error("failed to sign URL: {0}")]
    Signing(String),
}

/// A binary staged in blob storage for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    pub bucket: String,
    pub object_id: String,
    pub signed_url: String,
}

/// Delivers a notification to a single recipient.
///
/// Implementations must be thread-safe; the dispatcher calls `send_to_one`
/// concurrently for different targets of the same request.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Send `notification` to `target` and return the provider's message id.
    async fn send_to_one(
        &self,
        target: &str,
        notification: &ResolvedNotification,
    ) -> Result<String, ProviderError>;

    /// Provider name used in logs and metrics.
    fn name(&self) -> &'static str;
}

/// Temporary object storage used to turn media bytes into a fetchable URL.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload `bytes` under a fresh object name and return a signed URL for it.
    async fn upload(
        &self,
        bytes: &[u8],
        mime_type: &str,
        bucket: &str,
    ) -> Result<UploadedObject, StorageError>;

    /// Delete a previously uploaded object.
    async fn delete(&self, object: &UploadedObject) -> Result<(), StorageError>;
}

/// Source of OAuth2 bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ProviderError>;
}
