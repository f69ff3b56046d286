use std::path::PathBuf;

use reqwest::Client;

use super::auth::Credentials;
use crate::{
    error::{InstafyError, Result},
    models::{encode_base64, GenerateContentRequest, GenerateContentResponse, InlineImage},
};

#[derive(Clone, Debug)]
pub struct ImageEditClient {
    client: Client,
    url: String,
    credentials: Credentials,
}

impl ImageEditClient {
    pub fn new(client: Client, url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            client,
            url: url.into(),
            credentials,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn edit_inline(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<GenerateContentResponse> {
        let request = GenerateContentRequest::image_edit(prompt, images.to_vec());
        self.send(&request).await
    }

    /// Reads each file and sends it as a PNG inline part.
    pub async fn edit_files(
        &self,
        prompt: &str,
        paths: &[PathBuf],
    ) -> Result<GenerateContentResponse> {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path).await?;
            images.push(InlineImage::png(encode_base64(&bytes)));
        }

        let request = GenerateContentRequest::image_edit(prompt, images);
        self.send(&request).await
    }

    async fn send(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let image_count = request
            .contents
            .first()
            .map_or(0, |content| content.parts.len().saturating_sub(1));
        log::info!(
            "Requesting image edit with {} image(s) using {} credentials",
            image_count,
            self.credentials.kind()
        );

        let headers = self.credentials.headers().await?;
        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| InstafyError::RequestError(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Gemini returned HTTP {}: {}", status.as_u16(), body);
            return Err(InstafyError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| InstafyError::ResponseError(e.to_string()))?;
        log::debug!("Gemini response length: {} bytes", text.len());

        serde_json::from_str(&text).map_err(|e| InstafyError::ResponseError(e.to_string()))
    }
}
