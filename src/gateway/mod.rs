#[cfg(feature = "server")]
pub mod server;
pub mod temp;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    config::{Config, GeminiConfig},
    error::{InstafyError, Result},
    gemini::{GeminiClient, ImageEditor},
    models::{decode_base64, InlineImage, RawEditRequest},
};

pub use temp::TempUploads;

pub const MISSING_PROMPT: &str = "Missing prompt";
pub const MISSING_IMAGES: &str = "Provide imagesBase64[] or imagesInline[]";
pub const EMPTY_IMAGES: &str = "imagesBase64[] is empty";

/// Where the images of a validated request come from.
#[derive(Debug, Clone, PartialEq)]
pub enum EditImages {
    /// Sent to the model as given.
    Inline(Vec<InlineImage>),
    /// Decoded bytes, routed through temp files.
    Base64(Vec<Vec<u8>>),
}

impl EditImages {
    pub fn len(&self) -> usize {
        match self {
            EditImages::Inline(images) => images.len(),
            EditImages::Base64(images) => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEdit {
    pub prompt: String,
    pub images: EditImages,
}

/// Server side of an image edit: validates the request, calls the model and
/// returns the base64 of the first image it produced.
#[derive(Clone)]
pub struct EditGateway {
    editor: Arc<dyn ImageEditor>,
    temp_dir: PathBuf,
}

impl EditGateway {
    pub fn new(editor: Arc<dyn ImageEditor>) -> Self {
        Self {
            editor,
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let gemini_config = config.gemini.clone().unwrap_or_else(GeminiConfig::from_env);
        let client = GeminiClient::new(gemini_config)?;
        Ok(Self::new(Arc::new(client)).with_temp_dir(config.temp_dir_or_default()))
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn temp_dir(&self) -> &PathBuf {
        &self.temp_dir
    }

    /// Entry point for raw HTTP bodies.
    pub async fn handle_json(&self, body: &[u8]) -> Result<String> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| InstafyError::ValidationError(format!("Invalid JSON body: {}", e)))?;
        self.handle(value).await
    }

    pub async fn handle(&self, body: Value) -> Result<String> {
        let request = Self::validate(RawEditRequest::from_value(body))?;
        self.edit(request).await
    }

    pub fn validate(raw: RawEditRequest) -> Result<ValidatedEdit> {
        let prompt = match raw.prompt {
            Some(Value::String(prompt)) if !prompt.is_empty() => prompt,
            _ => return Err(InstafyError::ValidationError(MISSING_PROMPT.into())),
        };

        let inline = raw.images_inline.as_ref().and_then(Value::as_array);
        let base64 = raw.images_base64.as_ref().and_then(Value::as_array);

        if inline.is_none() && base64.is_none() {
            return Err(InstafyError::ValidationError(MISSING_IMAGES.into()));
        }

        if let Some(entries) = inline.filter(|entries| !entries.is_empty()) {
            let images = entries
                .iter()
                .enumerate()
                .map(|(index, entry)| parse_inline_entry(index, entry))
                .collect::<Result<Vec<_>>>()?;
            return Ok(ValidatedEdit {
                prompt,
                images: EditImages::Inline(images),
            });
        }

        let entries = match base64 {
            Some(entries) if entries.is_empty() => {
                return Err(InstafyError::ValidationError(EMPTY_IMAGES.into()))
            }
            Some(entries) => entries,
            None => return Err(InstafyError::ValidationError(MISSING_IMAGES.into())),
        };
        let images = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_base64_entry(index, entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(ValidatedEdit {
            prompt,
            images: EditImages::Base64(images),
        })
    }

    pub async fn edit(&self, request: ValidatedEdit) -> Result<String> {
        log::info!(
            "Editing {} image(s), prompt length {}",
            request.images.len(),
            request.prompt.len()
        );

        let response = match &request.images {
            EditImages::Inline(images) => self.editor.edit_inline(&request.prompt, images).await?,
            EditImages::Base64(images) => {
                let uploads = TempUploads::write_all(&self.temp_dir, images).await?;
                let result = self.editor.edit_files(&request.prompt, uploads.paths()).await;
                uploads.cleanup().await;
                result?
            }
        };

        match response.first_inline_image() {
            Some(image) => Ok(image.to_string()),
            None => {
                if let Some(reason) = response.block_reason() {
                    log::warn!("Gemini blocked the prompt: {}", reason);
                }
                Err(InstafyError::NoImageReturned)
            }
        }
    }
}

fn parse_inline_entry(index: usize, entry: &Value) -> Result<InlineImage> {
    let image: InlineImage = serde_json::from_value(entry.clone()).map_err(|_| {
        InstafyError::ValidationError(format!(
            "imagesInline[{}] must be an object with string data and mimeType",
            index
        ))
    })?;
    if image.mime_type.is_empty() {
        return Err(InstafyError::ValidationError(format!(
            "imagesInline[{}].mimeType is empty",
            index
        )));
    }
    if image.data.is_empty() || decode_base64(&image.data).is_err() {
        return Err(InstafyError::ValidationError(format!(
            "imagesInline[{}].data is not valid base64",
            index
        )));
    }
    Ok(image)
}

fn parse_base64_entry(index: usize, entry: &Value) -> Result<Vec<u8>> {
    let data = entry.as_str().ok_or_else(|| {
        InstafyError::ValidationError(format!("imagesBase64[{}] must be a string", index))
    })?;
    match decode_base64(data) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(InstafyError::ValidationError(format!(
            "imagesBase64[{}] is not valid base64",
            index
        ))),
    }
}
