use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::error::Result;

/// Files written for one gateway request. They are removed by `cleanup`, or
/// on drop if the request never got that far.
#[derive(Debug, Default)]
pub struct TempUploads {
    paths: Vec<PathBuf>,
}

impl TempUploads {
    /// `instafy-upload-<unix millis>-<uuid>.png` inside `dir`.
    pub fn unique_path(dir: &Path) -> PathBuf {
        dir.join(format!(
            "instafy-upload-{}-{}.png",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    pub async fn write_all(dir: &Path, images: &[Vec<u8>]) -> Result<Self> {
        let mut uploads = TempUploads::default();
        for bytes in images {
            let path = Self::unique_path(dir);
            uploads.paths.push(path.clone());
            if let Err(e) = tokio::fs::write(&path, bytes).await {
                log::error!("Failed to write temp upload {}: {}", path.display(), e);
                uploads.cleanup().await;
                return Err(e.into());
            }
        }
        log::debug!("Wrote {} temp upload(s) to {}", uploads.paths.len(), dir.display());
        Ok(uploads)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Best-effort removal; failures are logged and ignored.
    pub async fn cleanup(mut self) {
        let paths = std::mem::take(&mut self.paths);
        join_all(paths.iter().map(|path| async move {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log::debug!("Ignoring temp upload cleanup failure {}: {}", path.display(), e);
            }
        }))
        .await;
    }
}

impl Drop for TempUploads {
    fn drop(&mut self) {
        for path in &self.paths {
            let _ = std::fs::remove_file(path);
        }
    }
}
