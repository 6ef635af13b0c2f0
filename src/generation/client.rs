use std::sync::Arc;

use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::generation::request::GenerationRequest;
use crate::media::EncodedImage;
use crate::utils::timing::log_generation_timing;

/// Internal failure classification. Callers show every variant to the user as the
/// same generic message; the variants exist for logs.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no Gemini API key is configured")]
    MissingCredential,
    #[error("request to the generation service failed: {0}")]
    Transport(String),
    #[error("generation service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("generation service returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("generation service returned no candidates")]
    EmptyResponse,
    #[error("generation service responded without image data")]
    NoImageInResponse,
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::MissingCredential => "missing_credential",
            GenerationError::Transport(_) => "transport",
            GenerationError::Status { status: 401 | 403, .. } => "auth",
            GenerationError::Status { status: 429, .. } => "quota",
            GenerationError::Status { .. } => "status",
            GenerationError::MalformedResponse(_) => "malformed_response",
            GenerationError::EmptyResponse => "empty_response",
            GenerationError::NoImageInResponse => "no_image",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsePart {
    Text {
        text: String,
    },
    InlineImage {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateContentResponse {
    fn first_candidate_parts(&self) -> Option<&[ResponsePart]> {
        let candidate = self.candidates.as_deref()?.first()?;
        Some(
            candidate
                .content
                .as_ref()
                .and_then(|content| content.parts.as_deref())
                .unwrap_or(&[]),
        )
    }

    pub fn summary(&self) -> Value {
        let mut text_parts = 0usize;
        let mut image_parts = 0usize;
        let mut other_parts = 0usize;
        let mut text_preview = None;

        for part in self.first_candidate_parts().unwrap_or(&[]) {
            match part {
                ResponsePart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                ResponsePart::InlineImage { .. } => image_parts += 1,
                ResponsePart::Other(_) => other_parts += 1,
            }
        }

        json!({
            "candidates": self.candidates.as_ref().map(Vec::len).unwrap_or(0),
            "textParts": text_parts,
            "imageParts": image_parts,
            "otherParts": other_parts,
            "textPreview": text_preview
        })
    }
}

/// Scans the first candidate in order and returns the first inline image. Text
/// commentary around the image is dropped.
pub fn extract_first_image(
    response: &GenerateContentResponse,
) -> Result<EncodedImage, GenerationError> {
    let parts = response
        .first_candidate_parts()
        .ok_or(GenerationError::EmptyResponse)?;

    for part in parts {
        match part {
            ResponsePart::InlineImage { inline_data } => {
                if !inline_data.mime_type.trim().to_ascii_lowercase().starts_with("image/") {
                    continue;
                }
                return EncodedImage::from_base64(&inline_data.data, Some(&inline_data.mime_type))
                    .map_err(|err| GenerationError::MalformedResponse(err.to_string()));
            }
            ResponsePart::Text { .. } | ResponsePart::Other(_) => {}
        }
    }

    Err(GenerationError::NoImageInResponse)
}

pub trait GenerationTransport {
    fn model(&self) -> &str;

    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse, GenerationError>;
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

/// Talks to the Gemini `generateContent` endpoint. The credential comes from the
/// `Config` handed in at construction.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    http: Client,
    config: Arc<Config>,
}

impl GeminiTransport {
    pub fn new(http: Client, config: Arc<Config>) -> Self {
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.gemini_api_base_url, self.config.gemini_image_model
        )
    }

    fn redact(&self, text: &str) -> String {
        let key = self.config.gemini_api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }
}

impl GenerationTransport for GeminiTransport {
    fn model(&self) -> &str {
        &self.config.gemini_image_model
    }

    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let api_key = self.config.gemini_api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::MissingCredential);
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "generation.gemini", model = self.model(), payload = %request.summary());
        }

        let response = match self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request.to_payload())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err_text = self.redact(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                return Err(GenerationError::Transport(err_text));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GenerationError::Transport(self.redact(&err.to_string())))?;

        if !status.is_success() {
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: message.unwrap_or(body_summary),
            });
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "generation.gemini", model = self.model(), response = %parsed.summary());
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationClient<T> {
    transport: T,
}

impl<T: GenerationTransport> GenerationClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn model(&self) -> &str {
        self.transport.model()
    }

    pub async fn submit(&self, request: &GenerationRequest) -> Result<EncodedImage, GenerationError> {
        log_generation_timing("gemini", self.model(), "generate_portrait", || async {
            let response = self.transport.generate_content(request).await?;
            extract_first_image(&response)
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Replays scripted responses and records every request it receives.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedTransport {
        responses: Arc<Mutex<VecDeque<Result<GenerateContentResponse, GenerationError>>>>,
        pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
    }

    impl ScriptedTransport {
        pub fn push(&self, response: Result<GenerateContentResponse, GenerationError>) {
            self.responses.lock().push_back(response);
        }

        pub fn push_json(&self, body: Value) {
            let parsed = serde_json::from_value(body).expect("response fixture");
            self.push(Ok(parsed));
        }

        pub fn push_image(&self, image: &EncodedImage) {
            self.push_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "inlineData": { "mimeType": image.mime_type(), "data": image.to_base64() } }
                ] } }]
            }));
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl GenerationTransport for ScriptedTransport {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate_content(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerateContentResponse, GenerationError> {
            self.requests.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Err(GenerationError::Transport("no scripted response".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::ScriptedTransport;
    use super::*;
    use crate::generation::request::build_generation_request;
    use crate::media::fixtures;

    fn parse(body: Value) -> GenerateContentResponse {
        serde_json::from_value(body).expect("response")
    }

    #[test]
    fn returns_first_image_between_text_parts() {
        let image = fixtures::png(5, 7, 80);
        let response = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your portrait." },
                { "inlineData": { "mimeType": "image/png", "data": image.to_base64() } },
                { "text": "Enjoy!" }
            ] } }]
        }));

        assert_eq!(extract_first_image(&response).expect("image"), image);
    }

    #[test]
    fn only_the_first_candidate_is_considered() {
        let image = fixtures::png(2, 2, 3);
        let response = parse(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "no luck" }] } },
                { "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": image.to_base64() } }
                ] } }
            ]
        }));

        assert!(matches!(
            extract_first_image(&response),
            Err(GenerationError::NoImageInResponse)
        ));
    }

    #[test]
    fn zero_candidates_is_an_empty_response() {
        for body in [json!({}), json!({ "candidates": [] })] {
            assert!(matches!(
                extract_first_image(&parse(body)),
                Err(GenerationError::EmptyResponse)
            ));
        }
    }

    #[test]
    fn text_only_candidate_has_no_image() {
        let response = parse(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot do that." }] } }]
        }));
        assert!(matches!(
            extract_first_image(&response),
            Err(GenerationError::NoImageInResponse)
        ));

        let no_content = parse(json!({ "candidates": [{ "finishReason": "SAFETY" }] }));
        assert!(matches!(
            extract_first_image(&no_content),
            Err(GenerationError::NoImageInResponse)
        ));
    }

    #[test]
    fn unknown_parts_and_non_image_inline_data_are_skipped() {
        let image = fixtures::png(2, 2, 3);
        let response = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "thoughtSignature": "abc" },
                { "inlineData": { "mimeType": "audio/wav", "data": "AAAA" } },
                { "inlineData": { "mimeType": "image/png", "data": image.to_base64() } }
            ] } }]
        }));
        assert_eq!(extract_first_image(&response).expect("image"), image);
    }

    #[test]
    fn corrupt_image_data_is_malformed() {
        let response = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "not base64!!" } }
            ] } }]
        }));
        assert!(matches!(
            extract_first_image(&response),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn error_body_message_is_extracted() {
        let (message, _) =
            summarize_error_body(r#"{"error":{"code":429,"message":"Quota exceeded"}}"#);
        assert_eq!(message.as_deref(), Some("Quota exceeded"));

        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn status_errors_are_classified_for_logs() {
        let auth = GenerationError::Status { status: 403, message: String::new() };
        let quota = GenerationError::Status { status: 429, message: String::new() };
        assert_eq!(auth.kind(), "auth");
        assert_eq!(quota.kind(), "quota");
        assert_eq!(GenerationError::EmptyResponse.kind(), "empty_response");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let config = Arc::new(Config::for_api_key("  "));
        let transport = GeminiTransport::new(Client::new(), config);
        let face = fixtures::png(2, 2, 1);
        let request =
            build_generation_request(Some(&face), "Vogue.", "", None, "3:4").expect("request");

        let result = GenerationClient::new(transport).submit(&request).await;
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }

    #[test]
    fn endpoint_uses_configured_model_and_redacts_key() {
        let config = Arc::new(Config::for_api_key("secret-key"));
        let transport = GeminiTransport::new(Client::new(), config);
        assert_eq!(
            transport.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(transport.redact("url?key=secret-key"), "url?key=[redacted]");
    }

    #[tokio::test]
    async fn client_sends_the_request_unchanged_and_extracts_the_image() {
        let transport = ScriptedTransport::default();
        let result_image = fixtures::png(3, 4, 200);
        transport.push_image(&result_image);

        let face = fixtures::png(2, 2, 1);
        let request =
            build_generation_request(Some(&face), "Vogue.", "", None, "3:4").expect("request");
        let client = GenerationClient::new(transport.clone());

        assert_eq!(client.submit(&request).await.expect("image"), result_image);
        assert_eq!(transport.requests.lock().as_slice(), &[request]);
    }
}
