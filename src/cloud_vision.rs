//! # Cloud Vision Backend Module
//!
//! Text detection through a Google Cloud Vision compatible `images:annotate`
//! endpoint. The image is sent inline as base64 and the API key travels as
//! the `key` query parameter.
//!
//! Only flat text is reported. The response's `pages[].blocks` describe
//! layout regions that can span several receipt lines, so they are not
//! turned into [`TextBlock`](crate::ocr::TextBlock)s; lines come from
//! splitting the text on newlines.

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ocr::{ImageHandle, OcrOutput};
use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// HTTP client for the cloud vision backend
pub struct CloudVisionClient {
    http: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl CloudVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Initialization(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Run text detection on an image
    ///
    /// Non-success statuses, transport failures, timeouts and unreadable
    /// bodies are returned as errors; nothing is retried here.
    pub async fn recognize(&self, image: &ImageHandle, api_key: &str) -> Result<OcrOutput, OcrError> {
        let bytes = image.read_bytes()?;
        info!(
            "Sending {} byte image to cloud vision at {}",
            bytes.len(),
            self.endpoint
        );

        let request = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(&bytes),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!("Cloud vision answered with status {}", status.as_u16());
            return Err(OcrError::Http {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("unknown status").to_string()
                }),
            });
        }

        let output = parse_annotate_response(&body)?;
        debug!("Cloud vision returned {} characters", output.text.len());
        Ok(output)
    }

    fn transport_error(&self, error: reqwest::Error) -> OcrError {
        if error.is_timeout() {
            OcrError::Timeout(self.timeout_secs)
        } else {
            OcrError::Request(error.to_string())
        }
    }
}

/// Extract the recognized text from an `images:annotate` response body
///
/// The full text annotation is preferred; the first text annotation is used
/// when it is missing. The returned output never carries blocks, and layout
/// blocks in the body are ignored.
pub fn parse_annotate_response(body: &str) -> Result<OcrOutput, OcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let response = parsed
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::MalformedResponse("no responses in body".to_string()))?;

    if let Some(status) = response.error {
        return Err(OcrError::MalformedResponse(format!(
            "annotation error {}: {}",
            status.code, status.message
        )));
    }

    let (text, confidence) = match response.full_text_annotation {
        Some(annotation) => {
            let confidence = annotation.pages.first().and_then(|page| page.confidence);
            (annotation.text, confidence)
        }
        None => (
            response
                .text_annotations
                .into_iter()
                .next()
                .map(|annotation| annotation.description)
                .unwrap_or_default(),
            None,
        ),
    };

    Ok(OcrOutput {
        text,
        confidence,
        blocks: Vec::new(),
    })
}

fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Status,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|body| body.error.message)
        .filter(|message| !message.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_text_annotation() {
        let body = r#"{
            "responses": [{
                "fullTextAnnotation": {
                    "text": "FRESH FOODS MARKET\nBananas 2 lb $1.18\n",
                    "pages": [{"confidence": 0.97}]
                },
                "textAnnotations": [{"description": "ignored"}]
            }]
        }"#;

        let output = parse_annotate_response(body).unwrap();
        assert_eq!(output.text, "FRESH FOODS MARKET\nBananas 2 lb $1.18\n");
        assert_eq!(output.confidence, Some(0.97));
        assert!(output.blocks.is_empty());
    }

    #[test]
    fn test_layout_blocks_yield_newline_lines() {
        // one layout block covering both item lines
        let body = r#"{
            "responses": [{
                "fullTextAnnotation": {
                    "text": "Whole Milk $3.49\nBread $2.79\n",
                    "pages": [{
                        "confidence": 0.91,
                        "blocks": [{"blockType": "TEXT", "confidence": 0.9}]
                    }]
                }
            }]
        }"#;

        let output = parse_annotate_response(body).unwrap();
        assert!(output.blocks.is_empty());
        assert_eq!(output.lines(), vec!["Whole Milk $3.49", "Bread $2.79"]);
    }

    #[test]
    fn test_parse_falls_back_to_text_annotations() {
        let body = r#"{"responses": [{"textAnnotations": [{"description": "Milk $3.49"}]}]}"#;
        let output = parse_annotate_response(body).unwrap();
        assert_eq!(output.text, "Milk $3.49");
        assert_eq!(output.confidence, None);
    }

    #[test]
    fn test_parse_empty_image_response() {
        let output = parse_annotate_response(r#"{"responses": [{}]}"#).unwrap();
        assert!(output.text.is_empty());
    }

    #[test]
    fn test_parse_malformed_responses() {
        assert!(matches!(
            parse_annotate_response("not json"),
            Err(OcrError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_annotate_response(r#"{"responses": []}"#),
            Err(OcrError::MalformedResponse(_))
        ));

        let err = parse_annotate_response(
            r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid."}}"#;
        assert_eq!(error_message(body).as_deref(), Some("API key not valid."));
        assert_eq!(error_message("<html>"), None);
    }
}
