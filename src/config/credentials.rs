//! Service-account credential material.

use std::fmt;
use std::path::{Path, PathBuf};

use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Either service_account_json or service_account_file must be provided")]
    Missing,

    #[error("failed to read service account file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid service account JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid service account: {0}")]
    Invalid(String),

    #[error("invalid service account private key: {0}")]
    InvalidKey(String),
}

/// Where the service account comes from. Resolved once at load time.
#[derive(Debug, Clone)]
pub enum ServiceAccountSource {
    /// JSON text or an already-parsed object
    Inline(serde_json::Value),
    File(PathBuf),
}

impl ServiceAccountSource {
    /// Inline JSON wins when both are configured.
    pub fn from_config(
        json: Option<&serde_json::Value>,
        file: Option<&Path>,
    ) -> Result<Self, CredentialError> {
        match (json, file) {
            (Some(value), _) if !is_blank(value) => Ok(Self::Inline(value.clone())),
            (_, Some(path)) if !path.as_os_str().is_empty() => Ok(Self::File(path.to_path_buf())),
            _ => Err(CredentialError::Missing),
        }
    }

    pub fn load(&self) -> Result<ServiceAccountKey, CredentialError> {
        let key: ServiceAccountKey = match self {
            Self::Inline(serde_json::Value::String(text)) => serde_json::from_str(text)?,
            Self::Inline(value @ serde_json::Value::Object(_)) => {
                serde_json::from_value(value.clone())?
            }
            Self::Inline(_) => {
                return Err(CredentialError::Invalid(
                    "service_account_json must be a JSON string or object".to_string(),
                ))
            }
            Self::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str(&text)?
            }
        };

        key.validate()?;
        Ok(key)
    }
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The subset of a Google service-account key file the service uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    fn validate(&self) -> Result<(), CredentialError> {
        if self.project_id.is_empty() {
            return Err(CredentialError::Invalid("project_id is empty".to_string()));
        }
        if self.client_email.is_empty() {
            return Err(CredentialError::Invalid("client_email is empty".to_string()));
        }
        Ok(())
    }

    pub fn encoding_key(&self) -> Result<EncodingKey, CredentialError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))
    }

    /// Firebase's default Cloud Storage bucket for this project.
    pub fn default_bucket(&self) -> String {
        format!("{}.appspot.com", self.project_id)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
