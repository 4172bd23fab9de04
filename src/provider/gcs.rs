//! Cloud Storage client used to stage notification images.
//!
//! Objects are uploaded through the JSON API and exposed to devices through
//! V4 signed URLs (`GOOG4-RSA-SHA256`), signed locally with the service
//! account's private key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey};
use sha2::{Digest, Sha256};
use url::form_urlencoded::byte_serialize;
use uuid::Uuid;

use crate::config::{CredentialError, ServiceAccountKey};

use super::{BlobStorage, StorageError, TokenProvider, UploadedObject};

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

const SIGNING_HOST: &str = "storage.googleapis.com";
const SIGNING_ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// Upper bound Cloud Storage accepts for `X-Goog-Expires` (7 days)
const MAX_SIGNED_URL_TTL_SECS: u64 = 604_800;

/// Prefix for every staged object
const OBJECT_PREFIX: &str = "push-media";

/// Build a fresh, unique object name for a binary of the given MIME type.
pub fn object_name_for(mime_type: &str) -> String {
    let subtype = mime_type
        .split(';')
        .next()
        .and_then(|m| m.split('/').nth(1))
        .map(|s| s.split('+').next().unwrap_or(s).trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));

    let extension = match subtype.as_deref() {
        Some("jpeg") => "jpg".to_string(),
        Some(other) => other.to_string(),
        None => "bin".to_string(),
    };

    format!("{}/{}.{}", OBJECT_PREFIX, Uuid::new_v4(), extension)
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Percent-encode every path segment but keep the separators.
fn encode_path(path: &str) -> String {
    path.split('/').map(encode).collect::<Vec<_>>().join("/")
}

/// Produces V4 signed GET URLs for Cloud Storage objects.
pub struct UrlSigner {
    client_email: String,
    encoding_key: EncodingKey,
}

impl UrlSigner {
    pub fn new(key: &ServiceAccountKey) -> Result<Self, CredentialError> {
        Ok(Self {
            client_email: key.client_email.clone(),
            encoding_key: key.encoding_key()?,
        })
    }

    /// Canonical query string, already sorted by parameter name.
    fn canonical_query(&self, now: DateTime<Utc>, ttl: Duration) -> String {
        let datetime = now.format("%Y%m%dT%H%M%SZ").to_string();
        let credential = format!(
            "{}/{}/auto/storage/goog4_request",
            self.client_email,
            now.format("%Y%m%d")
        );
        let expires = ttl.as_secs().clamp(1, MAX_SIGNED_URL_TTL_SECS);

        format!(
            "X-Goog-Algorithm={}&X-Goog-Credential={}&X-Goog-Date={}&X-Goog-Expires={}&X-Goog-SignedHeaders=host",
            SIGNING_ALGORITHM,
            encode(&credential),
            datetime,
            expires
        )
    }

    /// The string that gets signed for a GET on `bucket/object`.
    pub fn string_to_sign(
        &self,
        bucket: &str,
        object: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> String {
        let canonical_uri = format!("/{}/{}", bucket, encode_path(object));
        let canonical_request = format!(
            "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            canonical_uri,
            self.canonical_query(now, ttl),
            SIGNING_HOST
        );

        format!(
            "{}\n{}\n{}/auto/storage/goog4_request\n{}",
            SIGNING_ALGORITHM,
            now.format("%Y%m%dT%H%M%SZ"),
            now.format("%Y%m%d"),
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        )
    }

    pub fn sign_url(
        &self,
        bucket: &str,
        object: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let to_sign = self.string_to_sign(bucket, object, now, ttl);

        // jsonwebtoken hands back base64url; Cloud Storage wants hex
        let signature = jsonwebtoken::crypto::sign(to_sign.as_bytes(), &self.encoding_key, Algorithm::RS256)
            .map_err(|e| StorageError::Signing(e.to_string()))?;
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| StorageError::Signing(e.to_string()))?;

        Ok(format!(
            "https://{}/{}/{}?{}&X-Goog-Signature={}",
            SIGNING_HOST,
            bucket,
            encode_path(object),
            self.canonical_query(now, ttl),
            hex::encode(raw)
        ))
    }
}

/// Cloud Storage backed [`BlobStorage`].
pub struct GcsStorage {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
    signer: UrlSigner,
    signed_url_ttl: Duration,
}

impl GcsStorage {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        signer: UrlSigner,
        signed_url_ttl: Duration,
    ) -> Self {
        Self::with_endpoint(
            tokens,
            signer,
            signed_url_ttl,
            DEFAULT_STORAGE_ENDPOINT,
            reqwest::Client::new(),
        )
    }

    pub fn with_endpoint(
        tokens: Arc<dyn TokenProvider>,
        signer: UrlSigner,
        signed_url_ttl: Duration,
        endpoint: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            tokens,
            signer,
            signed_url_ttl,
        }
    }

    async fn bearer(&self) -> Result<String, StorageError> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))
    }
}

#[async_trait]
impl BlobStorage for GcsStorage {
    #[tracing::instrument(name = "gcs.upload", skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bytes: &[u8],
        mime_type: &str,
        bucket: &str,
    ) -> Result<UploadedObject, StorageError> {
        let object_id = object_name_for(mime_type);
        // Sign first so a signing failure never leaves an orphaned object
        let signed_url = self
            .signer
            .sign_url(bucket, &object_id, Utc::now(), self.signed_url_ttl)?;
        let token = self.bearer().await?;

        let response = self
            .http
            .post(format!("{}/upload/storage/v1/b/{}/o", self.endpoint, bucket))
            .query(&[("uploadType", "media"), ("name", object_id.as_str())])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload { status, message });
        }

        Ok(UploadedObject {
            bucket: bucket.to_string(),
            object_id,
            signed_url,
        })
    }

    #[tracing::instrument(name = "gcs.delete", skip(self, object), fields(object_id = %object.object_id))]
    async fn delete(&self, object: &UploadedObject) -> Result<(), StorageError> {
        let token = self.bearer().await?;

        let response = self
            .http
            .delete(format!(
                "{}/storage/v1/b/{}/o/{}",
                self.endpoint,
                object.bucket,
                encode(&object.object_id)
            ))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        // Already gone counts as deleted
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Delete {
            status: status.as_u16(),
            message,
        })
    }
}
