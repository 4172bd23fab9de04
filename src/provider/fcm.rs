//! Firebase Cloud Messaging HTTP v1 client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::notification::ResolvedNotification;

use super::{MessagingProvider, ProviderError, TokenProvider};

pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

/// Body of a `messages:send` call.
#[derive(Debug, Clone, Serialize)]
pub struct FcmRequest {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub validate_only: bool,
    pub message: FcmMessage,
}

/// A message addressed to exactly one device token.
#[derive(Debug, Clone, Serialize)]
pub struct FcmMessage {
    pub token: String,
    pub notification: FcmNotification,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// iOS only renders images when they are repeated under `fcm_options`.
#[derive(Debug, Clone, Serialize)]
pub struct ApnsConfig {
    pub fcm_options: ApnsFcmOptions,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApnsFcmOptions {
    pub image: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// FCM HTTP v1 messaging client.
pub struct FcmClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    tokens: Arc<dyn TokenProvider>,
    validate_only: bool,
}

impl FcmClient {
    pub fn new(project_id: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_endpoint(project_id, tokens, DEFAULT_FCM_ENDPOINT, reqwest::Client::new())
    }

    /// Create a client against a custom endpoint (emulators, tests).
    pub fn with_endpoint(
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        endpoint: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            tokens,
            validate_only: false,
        }
    }

    /// Ask FCM to validate messages without delivering them.
    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint.trim_end_matches('/'),
            self.project_id
        )
    }

    /// Build the provider message for one target.
    pub fn build_request(&self, target: &str, notification: &ResolvedNotification) -> FcmRequest {
        let apns = notification.image_url.as_ref().map(|image| ApnsConfig {
            fcm_options: ApnsFcmOptions {
                image: image.clone(),
            },
            payload: serde_json::json!({ "aps": { "mutable-content": 1 } }),
        });

        FcmRequest {
            validate_only: self.validate_only,
            message: FcmMessage {
                token: target.to_string(),
                notification: FcmNotification {
                    title: notification.title.clone(),
                    body: notification.body.clone(),
                    image: notification.image_url.clone(),
                },
                data: notification.data.clone(),
                apns,
            },
        }
    }
}

fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            // Prefer the FCM-specific code (UNREGISTERED, QUOTA_EXCEEDED, ...)
            let code = envelope
                .error
                .details
                .iter()
                .find_map(|d| d.error_code.clone())
                .unwrap_or(envelope.error.status);
            ProviderError::Api {
                status,
                code,
                message: envelope.error.message,
            }
        }
        Err(_) => ProviderError::Api {
            status,
            code: "UNKNOWN".to_string(),
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl MessagingProvider for FcmClient {
    async fn send_to_one(
        &self,
        target: &str,
        notification: &ResolvedNotification,
    ) -> Result<String, ProviderError> {
        let token = self.tokens.access_token().await?;
        let request = self.build_request(target, notification);

        let response = self
            .http
            .post(self.send_url())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status, &text));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(sent.name)
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticTokenProvider;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn notification(image: Option<&str>) -> ResolvedNotification {
        ResolvedNotification {
            title: "Hello".to_string(),
            body: "Test".to_string(),
            image_url: image.map(str::to_string),
            data: HashMap::from([("door".to_string(), "front".to_string())]),
        }
    }

    fn client(endpoint: &str) -> FcmClient {
        FcmClient::with_endpoint(
            "demo-project",
            Arc::new(StaticTokenProvider::new("test-token")),
            endpoint,
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_build_request_without_image() {
        let request = client(DEFAULT_FCM_ENDPOINT).build_request("T1", &notification(None));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["message"]["token"], "T1");
        assert_eq!(json["message"]["notification"]["title"], "Hello");
        assert_eq!(json["message"]["data"]["door"], "front");
        assert!(json["message"]["notification"].get("image").is_none());
        assert!(json["message"].get("apns").is_none());
        assert!(json.get("validate_only").is_none());
    }

    #[test]
    fn test_build_request_with_image() {
        let request = client(DEFAULT_FCM_ENDPOINT)
            .validate_only(true)
            .build_request("T1", &notification(Some("https://img/x.png")));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["validate_only"], true);
        assert_eq!(json["message"]["notification"]["image"], "https://img/x.png");
        assert_eq!(json["message"]["apns"]["fcm_options"]["image"], "https://img/x.png");
    }

    #[test]
    fn test_send_url() {
        let c = client("http://localhost:9099/");
        assert_eq!(
            c.send_url(),
            "http://localhost:9099/v1/projects/demo-project/messages:send"
        );
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/projects/demo-project/messages:send"))
            .and(matchers::header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/demo-project/messages/0:1234"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let name = client(&server.uri())
            .send_to_one("T1", &notification(None))
            .await
            .unwrap();
        assert_eq!(name, "projects/demo-project/messages/0:1234");
    }

    #[tokio::test]
    async fn test_send_unregistered_token() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        });

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(body))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .send_to_one("stale", &notification(None))
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, code, .. } => {
                assert_eq!(status, 404);
                assert_eq!(code, "UNREGISTERED");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_non_json() {
        match parse_error(502, "Bad Gateway") {
            ProviderError::Api { code, message, .. } => {
                assert_eq!(code, "UNKNOWN");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
