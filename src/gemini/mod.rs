pub mod auth;
pub mod image_client;

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::GeminiConfig,
    error::Result,
    models::{GenerateContentResponse, InlineImage},
};

pub use auth::{ApplicationDefaultSource, Credentials, MetadataTokenSource};
pub use image_client::ImageEditClient;

/// A generative backend that edits images from a prompt. The envelope is
/// returned as-is; picking the image out is left to the caller.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit_inline(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<GenerateContentResponse>;

    async fn edit_files(&self, prompt: &str, paths: &[PathBuf])
        -> Result<GenerateContentResponse>;
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    image_client: ImageEditClient,
    model: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = Client::new();
        let credentials = Credentials::from_config(&config, http.clone())?;
        Ok(Self::with_credentials(config, http, credentials))
    }

    pub fn with_credentials(config: GeminiConfig, http: Client, credentials: Credentials) -> Self {
        let url = config.generate_content_url();
        log::debug!("Gemini endpoint: {}", url);
        Self {
            image_client: ImageEditClient::new(http, url, credentials),
            model: config.model_or_default().to_string(),
        }
    }

    pub fn image(&self) -> &ImageEditClient {
        &self.image_client
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ImageEditor for GeminiClient {
    async fn edit_inline(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<GenerateContentResponse> {
        self.image_client.edit_inline(prompt, images).await
    }

    async fn edit_files(
        &self,
        prompt: &str,
        paths: &[PathBuf],
    ) -> Result<GenerateContentResponse> {
        self.image_client.edit_files(prompt, paths).await
    }
}
