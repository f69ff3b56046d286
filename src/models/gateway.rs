use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::image::InlineImage;
use crate::error::{InstafyError, Result};

/// Body of `POST /api/gemini-edit` as sent by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_base64: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_inline: Option<Vec<InlineImage>>,
}

impl EditRequest {
    pub fn base64(prompt: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images_base64: Some(images),
            images_inline: None,
        }
    }

    pub fn inline(prompt: impl Into<String>, images: Vec<InlineImage>) -> Self {
        Self {
            prompt: prompt.into(),
            images_base64: None,
            images_inline: Some(images),
        }
    }
}

/// Lenient view of an incoming body. Fields stay untyped so that a wrong
/// shape is reported as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEditRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub images_base64: Option<Value>,
    #[serde(default)]
    pub images_inline: Option<Value>,
}

impl RawEditRequest {
    /// Non-object bodies behave like an empty object.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            serde_json::from_value(value).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditResponse {
    #[serde(rename = "imageBase64")]
    pub image_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

/// Whatever the gateway answered, success or not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayReply {
    /// Set from the HTTP status by the caller, not read from the body.
    #[serde(skip)]
    pub success: bool,
    #[serde(default, rename = "imageBase64")]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GatewayReply {
    pub fn ok(image_base64: impl Into<String>) -> Self {
        Self {
            success: true,
            image_base64: Some(image_base64.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            image_base64: None,
            error: Some(error.into()),
        }
    }

    /// The image, or the gateway's error text, or `fallback` when the
    /// gateway gave neither.
    pub fn into_image(self, fallback: &str) -> Result<String> {
        match self.image_base64 {
            Some(image) if self.success && !image.is_empty() => Ok(image),
            _ => Err(InstafyError::PipelineError(
                self.error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
