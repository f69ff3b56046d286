use async_trait::async_trait;
use imgly_bgremove::{
    BackendType, BackgroundRemovalProcessor, ModelDownloader, ModelSource, ModelSpec,
    OutputFormat, ProcessorConfig, ProcessorConfigBuilder,
};
use tokio::sync::OnceCell;

use super::BackgroundRemover;
use crate::{
    config::RemoverConfig,
    error::{InstafyError, Result},
    models::ImagePayload,
};

fn removal_error(e: impl std::fmt::Display) -> InstafyError {
    InstafyError::BackgroundRemovalError(e.to_string())
}

/// In-process removal with `imgly-bgremove` on its pure Rust tract backend.
/// The model is downloaded into the imgly cache on first use.
#[derive(Debug)]
pub struct ImglyRemover {
    model_url: String,
    model_id: OnceCell<String>,
}

impl ImglyRemover {
    pub fn new(model_url: impl Into<String>) -> Self {
        Self {
            model_url: model_url.into(),
            model_id: OnceCell::new(),
        }
    }

    pub fn from_config(config: &RemoverConfig) -> Self {
        Self::new(config.imgly_model_url_or_default())
    }

    async fn ensure_model(&self) -> Result<String> {
        self.model_id
            .get_or_try_init(|| async {
                log::info!("Fetching background removal model {}", self.model_url);
                let downloader = ModelDownloader::new().map_err(removal_error)?;
                downloader
                    .download_model(&self.model_url, false)
                    .await
                    .map_err(removal_error)
            })
            .await
            .cloned()
    }
}

/// Tract backend, PNG output, model taken from the download cache.
fn processor_config(model_id: String) -> Result<ProcessorConfig> {
    ProcessorConfigBuilder::new()
        .model_spec(ModelSpec {
            source: ModelSource::Downloaded(model_id),
            variant: None,
        })
        .backend_type(BackendType::Tract)
        .output_format(OutputFormat::Png)
        .build()
        .map_err(removal_error)
}

#[async_trait]
impl BackgroundRemover for ImglyRemover {
    fn name(&self) -> &'static str {
        "imgly"
    }

    async fn preload(&self) -> Result<()> {
        self.ensure_model().await.map(|_| ())
    }

    async fn remove_background(&self, image: &ImagePayload) -> Result<ImagePayload> {
        let model_id = self.ensure_model().await?;
        let bytes = image.bytes().to_vec();

        let output = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let config = processor_config(model_id)?;
            let mut processor = BackgroundRemovalProcessor::new(config).map_err(removal_error)?;
            let result = processor.process_bytes(&bytes).map_err(removal_error)?;
            result.to_bytes(OutputFormat::Png, 100).map_err(removal_error)
        })
        .await
        .map_err(|e| InstafyError::InternalError(format!("removal task panicked: {}", e)))??;

        ImagePayload::png(output).map_err(removal_error)
    }
}
