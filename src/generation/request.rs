use serde_json::{json, Map, Value};

use crate::media::EncodedImage;
use crate::session::SessionState;
use crate::styles::{resolve_style, StyleDefinition};

const CUSTOM_TEXT_PLACEHOLDER: &str = "None";

const REFERENCE_DIRECTIVE: &str = " Additionally, incorporate the hairstyle, clothing style, and lighting vibe from the second reference image provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a face image is required before generating a portrait")]
    MissingFaceImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    Image(EncodedImage),
    Text(String),
}

impl RequestPart {
    fn to_json(&self) -> Value {
        match self {
            RequestPart::Image(image) => json!({
                "inlineData": {
                    "mimeType": image.mime_type(),
                    "data": image.to_base64()
                }
            }),
            RequestPart::Text(text) => json!({ "text": text }),
        }
    }

    fn summary(&self) -> Value {
        match self {
            RequestPart::Image(image) => {
                json!({ "inlineData": { "mimeType": image.mime_type(), "dataLen": image.len() } })
            }
            RequestPart::Text(text) => json!({ "textLen": text.chars().count() }),
        }
    }
}

/// One outbound generation call. The part order is load-bearing: the instruction
/// text refers to "the first image" and "the second reference image" by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    parts: Vec<RequestPart>,
    aspect_ratio: String,
}

impl GenerationRequest {
    #[cfg(test)]
    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }

    #[cfg(test)]
    pub fn aspect_ratio(&self) -> &str {
        &self.aspect_ratio
    }

    #[cfg(test)]
    pub fn instruction_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            RequestPart::Text(text) => Some(text.as_str()),
            RequestPart::Image(_) => None,
        })
    }

    pub fn to_payload(&self) -> Value {
        let parts: Vec<Value> = self.parts.iter().map(RequestPart::to_json).collect();
        let mut generation_config = Map::new();
        generation_config.insert("responseModalities".to_string(), json!(["TEXT", "IMAGE"]));
        generation_config.insert(
            "imageConfig".to_string(),
            json!({ "aspectRatio": self.aspect_ratio }),
        );

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": Value::Object(generation_config),
        })
    }

    /// Loggable shape of the payload without any image data.
    pub fn summary(&self) -> Value {
        json!({
            "parts": self.parts.iter().map(RequestPart::summary).collect::<Vec<_>>(),
            "aspectRatio": self.aspect_ratio,
        })
    }
}

/// A request together with the style it was resolved against.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request: GenerationRequest,
    pub style: &'static StyleDefinition,
}

pub fn compose_instruction(style_instruction: &str, custom_text: &str, has_reference: bool) -> String {
    let custom_text = if custom_text.trim().is_empty() {
        CUSTOM_TEXT_PLACEHOLDER
    } else {
        custom_text
    };

    let mut text = format!(
        "Generate a high-quality, professional realistic portrait based on the provided face.
CRITICAL: You must accurately maintain the facial features, bone structure, and identity of the person in the first image.
Style Context: {style_instruction}.
User Specific Requests: {custom_text}.
The final result should be a single, polished photograph that looks like a high-end studio shoot."
    );

    if has_reference {
        text.push_str(REFERENCE_DIRECTIVE);
    }

    text
}

pub fn build_generation_request(
    face_image: Option<&EncodedImage>,
    style_instruction: &str,
    custom_text: &str,
    reference_image: Option<&EncodedImage>,
    aspect_ratio: &str,
) -> Result<GenerationRequest, ValidationError> {
    let face_image = face_image.ok_or(ValidationError::MissingFaceImage)?;

    let instruction =
        compose_instruction(style_instruction, custom_text, reference_image.is_some());

    let mut parts = vec![
        RequestPart::Image(face_image.clone()),
        RequestPart::Text(instruction),
    ];
    if let Some(reference_image) = reference_image {
        parts.push(RequestPart::Image(reference_image.clone()));
    }

    Ok(GenerationRequest {
        parts,
        aspect_ratio: aspect_ratio.to_string(),
    })
}

pub fn build_from_session(
    state: &SessionState,
    aspect_ratio: &str,
) -> Result<PreparedRequest, ValidationError> {
    let style = resolve_style(state.selected_style_id());
    let request = build_generation_request(
        state.face_image(),
        style.generation_instruction,
        state.custom_text(),
        state.reference_image(),
        aspect_ratio,
    )?;
    Ok(PreparedRequest { request, style })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fixtures;

    #[test]
    fn refuses_to_build_without_a_face() {
        let state = SessionState::new();
        assert_eq!(
            build_from_session(&state, "3:4").err(),
            Some(ValidationError::MissingFaceImage)
        );
    }

    #[test]
    fn unknown_style_falls_back_to_first_entry() {
        let mut state = SessionState::new();
        state.set_face_image(fixtures::png(2, 2, 1));
        state.set_selected_style_id("watercolor");

        let prepared = build_from_session(&state, "3:4").expect("request");
        assert_eq!(prepared.style.id, "business");
        let text = prepared.request.instruction_text().expect("text");
        assert!(text.contains("Style Context: Professional corporate headshot"));
    }

    #[test]
    fn reference_image_is_always_last() {
        let face = fixtures::png(2, 2, 1);
        let reference = fixtures::png(3, 3, 2);
        let request = build_generation_request(
            Some(&face),
            "Cyberpunk style portrait.",
            "short hair",
            Some(&reference),
            "3:4",
        )
        .expect("request");

        match request.parts() {
            [RequestPart::Image(first), RequestPart::Text(text), RequestPart::Image(last)] => {
                assert_eq!(first, &face);
                assert_eq!(last, &reference);
                assert!(text.contains("first image"));
                assert!(text.ends_with(REFERENCE_DIRECTIVE));
                assert!(text.contains("User Specific Requests: short hair."));
            }
            other => panic!("unexpected part layout: {other:?}"),
        }
    }

    #[test]
    fn blank_custom_text_becomes_none_placeholder() {
        let text = compose_instruction("Minimal.", "   ", false);
        assert!(text.contains("User Specific Requests: None."));
        assert!(!text.contains("second reference image"));
    }

    #[test]
    fn payload_carries_aspect_ratio_and_inline_parts() {
        let face = fixtures::png(2, 2, 1);
        let request =
            build_generation_request(Some(&face), "Vogue.", "", None, "3:4").expect("request");
        let payload = request.to_payload();

        assert_eq!(
            payload.pointer("/generationConfig/imageConfig/aspectRatio"),
            Some(&json!("3:4"))
        );
        assert_eq!(
            payload.pointer("/contents/0/parts/0/inlineData/mimeType"),
            Some(&json!("image/png"))
        );
        assert_eq!(
            payload.pointer("/contents/0/parts/0/inlineData/data"),
            Some(&json!(face.to_base64()))
        );
        assert!(payload.pointer("/contents/0/parts/1/text").is_some());
        assert!(payload.pointer("/contents/0/parts/2").is_none());
    }

    #[test]
    fn summary_omits_image_data() {
        let face = fixtures::png(2, 2, 1);
        let request =
            build_generation_request(Some(&face), "Vogue.", "", None, "3:4").expect("request");
        let summary = request.summary().to_string();
        assert!(!summary.contains(&face.to_base64()));
        assert!(summary.contains("dataLen"));
    }
}
