pub mod command;
#[cfg(feature = "imgly")]
pub mod imgly;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::RemoverConfig,
    error::{InstafyError, Result},
    models::ImagePayload,
};

pub use command::CommandRemover;
#[cfg(feature = "imgly")]
pub use imgly::ImglyRemover;

/// Turns an image into a copy with a transparent background.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prepares model assets. Repeated calls after a success are no-ops.
    async fn preload(&self) -> Result<()> {
        Ok(())
    }

    async fn remove_background(&self, image: &ImagePayload) -> Result<ImagePayload>;
}

/// Startup hook: warms the remover up, logging instead of failing.
pub async fn preload(remover: &dyn BackgroundRemover) -> bool {
    let timer = crate::logger::timer(&format!("preload {}", remover.name()));
    let result = remover.preload().await;
    drop(timer);
    match result {
        Ok(()) => {
            log::info!("Background remover '{}' ready", remover.name());
            true
        }
        Err(e) => {
            log::warn!(
                "Background remover '{}' preload failed, continuing: {}",
                remover.name(),
                e
            );
            false
        }
    }
}

/// Builds the remover named by `backend` (`command` or `imgly`). Builds with
/// the `imgly` feature default to `imgly`.
pub fn from_config(config: &RemoverConfig) -> Result<Arc<dyn BackgroundRemover>> {
    match config.backend_or_default() {
        "command" => Ok(Arc::new(CommandRemover::from_config(config)?)),
        #[cfg(feature = "imgly")]
        "imgly" => Ok(Arc::new(ImglyRemover::from_config(config))),
        #[cfg(not(feature = "imgly"))]
        "imgly" => Err(InstafyError::ConfigError(
            "imgly remover requires the `imgly` feature".into(),
        )),
        other => Err(InstafyError::ConfigError(format!(
            "Unknown background remover: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyRemover;

    #[async_trait]
    impl BackgroundRemover for FlakyRemover {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn preload(&self) -> Result<()> {
            Err(InstafyError::BackgroundRemovalError("assets unreachable".into()))
        }

        async fn remove_background(&self, image: &ImagePayload) -> Result<ImagePayload> {
            Ok(image.clone())
        }
    }

    #[tokio::test]
    async fn test_preload_failure_is_not_fatal() {
        assert!(!preload(&FlakyRemover).await);
    }

    #[test]
    fn test_from_config_selects_backend() {
        let remover = from_config(&RemoverConfig::new()).unwrap();
        assert_eq!(remover.name(), crate::config::DEFAULT_REMOVER_BACKEND);

        let command = from_config(&RemoverConfig::new().with_backend("command")).unwrap();
        assert_eq!(command.name(), "command");

        let unknown = from_config(&RemoverConfig::new().with_backend("magic"));
        assert!(matches!(unknown, Err(InstafyError::ConfigError(_))));
    }
}
