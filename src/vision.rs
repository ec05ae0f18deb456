//! # Google Vision Module
//!
//! Label detection through the Vision REST API. The client reads its own
//! credentials document; the rest of the bot only knows the file's path.

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::service_errors::ServiceError;

pub const VISION_SERVICE: &str = "vision";
pub const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const MAX_LABELS: u32 = 10;

/// A label annotation returned by Vision
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

/// Anything that can name what an image shows
#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>, ServiceError>;
}

/// How requests are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum VisionAuth {
    ApiKey(String),
    AccessToken(String),
}

impl std::fmt::Debug for VisionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            VisionAuth::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

#[derive(Deserialize)]
struct CredentialsDocument {
    api_key: Option<String>,
    access_token: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl VisionAuth {
    /// Interpret a credentials document
    pub fn from_document(content: &str) -> Result<Self, ServiceError> {
        let doc: CredentialsDocument =
            serde_json::from_str(content).map_err(|e| credentials_error(e.to_string()))?;

        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        if let Some(key) = non_empty(doc.api_key) {
            return Ok(VisionAuth::ApiKey(key));
        }
        if let Some(token) = non_empty(doc.access_token) {
            return Ok(VisionAuth::AccessToken(token));
        }
        Err(credentials_error(match doc.kind.as_deref() {
            Some(kind) => format!("credentials of type `{kind}` are not supported, provide `api_key` or `access_token`"),
            None => "document has neither `api_key` nor `access_token`".to_string(),
        }))
    }
}

fn credentials_error(message: String) -> ServiceError {
    ServiceError::Credentials {
        service: VISION_SERVICE,
        message,
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<Label>,
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Extract labels from an `images:annotate` response body
pub fn parse_annotate_response(body: &str) -> Result<Vec<Label>, ServiceError> {
    let response: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::decode(VISION_SERVICE, e))?;

    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };

    if let Some(error) = first.error {
        return Err(ServiceError::Decode {
            service: VISION_SERVICE,
            message: format!("image error {}: {}", error.code, error.message),
        });
    }

    Ok(first.label_annotations)
}

/// Vision REST client
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    auth: VisionAuth,
    endpoint: String,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, auth: VisionAuth) -> Self {
        Self {
            http,
            auth,
            endpoint: VISION_ENDPOINT.to_string(),
        }
    }

    /// Build a client from the credentials document at `path`
    pub fn from_credentials_file(http: reqwest::Client, path: &Path) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| credentials_error(format!("{}: {e}", path.display())))?;
        Ok(Self::new(http, VisionAuth::from_document(&content)?))
    }

    /// Point the client at another endpoint (proxies, emulators)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LabelDetector for VisionClient {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>, ServiceError> {
        let body = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": "LABEL_DETECTION", "maxResults": MAX_LABELS }],
            }]
        });

        let request = self.http.post(&self.endpoint).json(&body);
        let request = match &self.auth {
            VisionAuth::ApiKey(key) => request.query(&[("key", key)]),
            VisionAuth::AccessToken(token) => request.bearer_auth(token),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::transport(VISION_SERVICE, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::transport(VISION_SERVICE, e))?;

        if !status.is_success() {
            return Err(ServiceError::Status {
                service: VISION_SERVICE,
                status: status.as_u16(),
                body: text,
            });
        }

        let labels = parse_annotate_response(&text)?;
        debug!(count = labels.len(), "Vision returned labels");
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        let body = r#"{
            "responses": [{
                "labelAnnotations": [
                    {"mid": "/m/09qck", "description": "Banana", "score": 0.97, "topicality": 0.97},
                    {"mid": "/m/02wbm", "description": "Food", "score": 0.91}
                ]
            }]
        }"#;

        let labels = parse_annotate_response(body).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].description, "Banana");
        assert!((labels[0].score - 0.97).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(parse_annotate_response(r#"{"responses": [{}]}"#)
            .unwrap()
            .is_empty());
        assert!(parse_annotate_response("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_image_error() {
        let body = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        let err = parse_annotate_response(body).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn test_auth_from_document() {
        assert_eq!(
            VisionAuth::from_document(r#"{"api_key": "AIza123"}"#).unwrap(),
            VisionAuth::ApiKey("AIza123".to_string())
        );
        assert_eq!(
            VisionAuth::from_document(r#"{"access_token": "ya29.x"}"#).unwrap(),
            VisionAuth::AccessToken("ya29.x".to_string())
        );
    }

    #[test]
    fn test_service_account_document_rejected() {
        let err = VisionAuth::from_document(
            r#"{"type": "service_account", "project_id": "macrocal", "private_key": "-----BEGIN"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Credentials { .. }));
        assert!(err.to_string().contains("service_account"));
    }

    #[test]
    fn test_auth_debug_is_redacted() {
        let rendered = format!("{:?}", VisionAuth::ApiKey("AIza123".to_string()));
        assert!(!rendered.contains("AIza123"));
    }
}
