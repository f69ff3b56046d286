use std::path::{Path, PathBuf};

use colored::*;

use crate::{
    error::Result,
    models::{pose_catalog, ArtifactKind},
    pipeline::{Artifacts, PipelineState},
};

/// Terminal rendition of the progress line shown under the run button.
pub fn render_progress(state: &PipelineState) -> String {
    let message = state.progress_message();
    match state {
        PipelineState::Error(_) => format!("{} {}", "error:".red().bold(), message.red()),
        PipelineState::CompositeDone => message.green().bold().to_string(),
        _ if state.is_in_progress() => message.cyan().to_string(),
        _ => message,
    }
}

/// Observer printing every state change to stdout.
pub fn progress_printer() -> impl Fn(&PipelineState) + Send + Sync + 'static {
    |state: &PipelineState| println!("{}", render_progress(state))
}

/// Writes each available result under its download name. A file that
/// cannot be written is logged and skipped.
pub async fn save_artifacts(artifacts: &Artifacts, dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let mut saved = Vec::new();
    for kind in ArtifactKind::ALL {
        let Some(image) = artifacts.get(kind) else {
            continue;
        };
        let path = dir.join(kind.file_name());
        match tokio::fs::write(&path, image.bytes()).await {
            Ok(()) => {
                log::info!("Saved {} to {}", kind.label(), path.display());
                saved.push(path);
            }
            Err(e) => log::error!("Failed to save {}: {}", path.display(), e),
        }
    }
    Ok(saved)
}

pub fn render_pose_catalog() -> String {
    pose_catalog()
        .iter()
        .map(|pose| {
            format!(
                "{}  {}  ({})\n    {}",
                pose.id.bold(),
                pose.label,
                pose.reference_image,
                pose.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
