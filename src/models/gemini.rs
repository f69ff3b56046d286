use serde::{Deserialize, Serialize};

use super::image::InlineImage;

pub const IMAGE_MODALITY: &str = "IMAGE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub generation_config: GenerationConfig,
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(InlineImage),
}

impl GenerateContentRequest {
    /// One user turn: the prompt as a text part, then one inline part per
    /// image in the given order.
    pub fn image_edit(prompt: &str, images: Vec<InlineImage>) -> Self {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::Text(prompt.to_string()));
        parts.extend(images.into_iter().map(Part::InlineData));

        Self {
            generation_config: GenerationConfig {
                response_modalities: vec![IMAGE_MODALITY.to_string()],
            },
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
        }
    }
}

/// Provider response. Every level is optional; only the first inline image
/// of the first candidate is ever read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Envelope with a single candidate holding one inline image part.
    pub fn with_image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            candidates: Some(vec![Candidate {
                content: Some(CandidateContent {
                    role: Some("model".to_string()),
                    parts: Some(vec![ResponsePart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: Some(mime_type.into()),
                            data: Some(data.into()),
                        }),
                    }]),
                }),
                finish_reason: Some("STOP".to_string()),
            }]),
            prompt_feedback: None,
            model_version: None,
        }
    }

    /// Base64 data of the first part carrying inline data in the first
    /// candidate. Empty data counts as absent.
    pub fn first_inline_image(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .iter()
            .find_map(|part| part.inline_data.as_ref())?
            .data
            .as_deref()
            .filter(|data| !data.is_empty())
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = GenerateContentRequest::image_edit(
            "make it blue",
            vec![InlineImage::png("AAAA"), InlineImage::new("image/jpeg", "BBBB")],
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "generationConfig": { "responseModalities": ["IMAGE"] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "make it blue" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "BBBB" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_extracts_first_inline_image_after_text_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "FIRST" } },
                    { "inlineData": { "mimeType": "image/png", "data": "SECOND" } }
                ] } },
                { "content": { "parts": [ { "inlineData": { "data": "OTHER" } } ] } }
            ],
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();
        assert_eq!(response.first_inline_image(), Some("FIRST"));
    }

    #[test]
    fn test_missing_levels_yield_none() {
        let shapes = [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [ {} ] }),
            json!({ "candidates": [ { "content": {} } ] }),
            json!({ "candidates": [ { "content": { "parts": [ { "text": "no image" } ] } } ] }),
            json!({ "candidates": [ { "content": { "parts": [ { "inlineData": { "data": "" } } ] } } ] }),
            json!({ "candidates": [ { "content": { "parts": [ { "inlineData": {} } ] } } ] }),
        ];
        for shape in shapes {
            let response: GenerateContentResponse = serde_json::from_value(shape.clone()).unwrap();
            assert_eq!(response.first_inline_image(), None, "shape: {}", shape);
        }
    }

    #[test]
    fn test_only_first_candidate_is_considered() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "refused" } ] } },
                { "content": { "parts": [ { "inlineData": { "data": "LATE" } } ] } }
            ],
            "promptFeedback": { "blockReason": "OTHER" }
        }))
        .unwrap();
        assert_eq!(response.first_inline_image(), None);
        assert_eq!(response.block_reason(), Some("OTHER"));
    }

    #[test]
    fn test_with_image_round_trips_through_json() {
        let response = GenerateContentResponse::with_image("IMG", "image/png");
        let text = serde_json::to_string(&response).unwrap();
        let parsed: GenerateContentResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.first_inline_image(), Some("IMG"));
    }
}
