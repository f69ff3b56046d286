use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{InstafyError, Result};

pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Base64 image data plus its MIME type, as carried in `inlineData` parts
/// and in the gateway's `imagesInline` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn png(data: impl Into<String>) -> Self {
        Self::new(DEFAULT_MIME_TYPE, data)
    }
}

/// Decoded image bytes. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(InstafyError::ValidationError("Image payload is empty".into()));
        }
        Ok(Self {
            bytes,
            mime_type: mime_type.into(),
        })
    }

    pub fn png(bytes: Vec<u8>) -> Result<Self> {
        Self::new(bytes, DEFAULT_MIME_TYPE)
    }

    /// Builds a payload whose MIME type is detected from the magic bytes,
    /// falling back to `image/png` for unknown formats.
    pub fn sniffed(bytes: Vec<u8>) -> Result<Self> {
        let mime_type = sniff_mime_type(&bytes).unwrap_or(DEFAULT_MIME_TYPE);
        Self::new(bytes, mime_type)
    }

    pub fn from_base64(data: &str, mime_type: Option<&str>) -> Result<Self> {
        let bytes = decode_base64(data)?;
        Self::new(bytes, mime_type.unwrap_or(DEFAULT_MIME_TYPE))
    }

    /// Parses a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (header, data) = url
            .split_once(',')
            .ok_or_else(|| InstafyError::ValidationError("Malformed data URL".into()))?;
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.strip_suffix(";base64"))
            .filter(|mime| !mime.is_empty());
        Self::from_base64(data, mime_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn to_inline(&self) -> InlineImage {
        InlineImage::new(self.mime_type.clone(), self.to_base64())
    }
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| InstafyError::ValidationError(format!("Invalid base64 image data: {}", e)))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}
