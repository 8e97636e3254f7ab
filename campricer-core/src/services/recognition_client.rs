//! Recognition service HTTP client
//!
//! Thin JSON transport to the remote recognition endpoints. The client does
//! no parsing beyond decoding the response body to a JSON value; envelope
//! unwrapping and field extraction belong to the response parser.

use crate::services::image_preparer::{ImagePayload, PrepareError};
use crate::services::response_parser::ParseError;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Image identification endpoint (per-item and batch)
pub const IDENTIFY_ENDPOINT: &str = "/identifyCamera";

/// Free-text lookup endpoint
pub const SEARCH_ENDPOINT: &str = "/textCameraLookUpOpenAIAPI";

const USER_AGENT: &str = "CamPricer/0.1.0 (https://github.com/campricer/campricer)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upload-path errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Transport-level failure (connect, timeout, body decode)
    #[error("Network error: {0}")]
    Network(String),

    /// Service returned a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Image could not be prepared for transmission
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// Response could not be parsed into a record
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Serialize)]
struct IdentifyRequest<'a> {
    image: &'a str,
    #[serde(rename = "type")]
    mime: &'a str,
    name: &'a str,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
}

#[derive(Serialize)]
struct BatchIdentifyRequest<'a> {
    images: Vec<&'a str>,
    source: &'a str,
    #[serde(rename = "batchMode")]
    batch_mode: bool,
    region: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    #[serde(rename = "cameraName")]
    camera_name: &'a str,
    region: &'a str,
    source: &'a str,
}

/// Recognition service client
pub struct RecognitionClient {
    http: reqwest::Client,
    base_url: String,
    source: String,
}

impl RecognitionClient {
    /// Create a client for the given base URL and platform source string
    pub fn new(
        base_url: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            source: source.into(),
        })
    }

    /// Platform source string attached to every request
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Identify a single image
    pub async fn identify(
        &self,
        payload: &ImagePayload,
        region: Option<&str>,
    ) -> Result<Value, UploadError> {
        let request = IdentifyRequest {
            image: &payload.data,
            mime: &payload.mime,
            name: &payload.file_name,
            source: &self.source,
            region,
        };
        self.post(IDENTIFY_ENDPOINT, &request).await
    }

    /// Identify one subject photographed from multiple angles, in one call
    pub async fn identify_batch(
        &self,
        payloads: &[ImagePayload],
        region: &str,
    ) -> Result<Value, UploadError> {
        let request = BatchIdentifyRequest {
            images: payloads.iter().map(|p| p.data.as_str()).collect(),
            source: &self.source,
            batch_mode: true,
            region,
        };
        self.post(IDENTIFY_ENDPOINT, &request).await
    }

    /// Look up a camera by free-text name
    pub async fn search(&self, camera_name: &str, region: &str) -> Result<Value, UploadError> {
        let request = SearchRequest {
            camera_name,
            region,
            source: &self.source,
        };
        self.post(SEARCH_ENDPOINT, &request).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, UploadError> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        tracing::debug!(url = %url, "posting recognition request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                "recognition service returned error status"
            );
            return Err(UploadError::Api(status.as_u16(), error_text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        tracing::info!(
            url = %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recognition request completed"
        );
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_succeeds() {
        assert!(RecognitionClient::new("http://localhost:4200", "Linux").is_ok());
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let client = RecognitionClient::new("http://localhost:4200/", "Linux").unwrap();
        assert_eq!(client.base_url, "http://localhost:4200");
    }

    #[test]
    fn batch_request_serializes_with_wire_field_names() {
        let payloads = vec![ImagePayload {
            data: "AAAA".to_string(),
            mime: "image/jpeg".to_string(),
            file_name: "uploaded_image_0.jpg".to_string(),
        }];
        let request = BatchIdentifyRequest {
            images: payloads.iter().map(|p| p.data.as_str()).collect(),
            source: "Linux",
            batch_mode: true,
            region: "Japan",
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["batchMode"], true);
        assert_eq!(json["region"], "Japan");
        assert_eq!(json["images"][0], "AAAA");
    }

    #[test]
    fn identify_request_omits_absent_region() {
        let request = IdentifyRequest {
            image: "AAAA",
            mime: "image/jpeg",
            name: "uploaded_image_0.jpg",
            source: "Linux",
            region: None,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["type"], "image/jpeg");
        assert!(json.get("region").is_none());
    }

    #[test]
    fn search_request_uses_camera_name_key() {
        let request = SearchRequest {
            camera_name: "Leica M6",
            region: "Europe",
            source: "Linux",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["cameraName"], "Leica M6");
    }
}
