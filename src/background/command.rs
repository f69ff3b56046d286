use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::BackgroundRemover;
use crate::{
    config::RemoverConfig,
    error::{InstafyError, Result},
    models::ImagePayload,
};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Delegates to an external tool such as `rembg`, exchanging images through
/// temp files. The command template must mention `{input}` and `{output}`.
#[derive(Debug)]
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
    temp_dir: PathBuf,
    warmed_up: OnceCell<()>,
}

impl CommandRemover {
    pub fn new(template: &str) -> Result<Self> {
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| {
            InstafyError::ConfigError("Background remover command is empty".into())
        })?;
        let args: Vec<String> = words.collect();

        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(InstafyError::ConfigError(format!(
                    "Background remover command must contain {}",
                    placeholder
                )));
            }
        }

        Ok(Self {
            program,
            args,
            temp_dir: std::env::temp_dir(),
            warmed_up: OnceCell::new(),
        })
    }

    pub fn from_config(config: &RemoverConfig) -> Result<Self> {
        Self::new(config.command_or_default())
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<Vec<u8>> {
        let result = Command::new(&self.program)
            .args(self.render_args(input, output))
            .output()
            .await
            .map_err(|e| {
                InstafyError::BackgroundRemovalError(format!(
                    "failed to start {}: {}",
                    self.program, e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(InstafyError::BackgroundRemovalError(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        tokio::fs::read(output).await.map_err(|e| {
            InstafyError::BackgroundRemovalError(format!(
                "{} produced no output: {}",
                self.program, e
            ))
        })
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "png",
    }
}

#[async_trait]
impl BackgroundRemover for CommandRemover {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn preload(&self) -> Result<()> {
        self.warmed_up
            .get_or_try_init(|| async {
                log::debug!("Warming up {}", self.program);
                Command::new(&self.program)
                    .arg("--version")
                    .output()
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        InstafyError::BackgroundRemovalError(format!(
                            "{} is not runnable: {}",
                            self.program, e
                        ))
                    })
            })
            .await
            .map(|_| ())
    }

    async fn remove_background(&self, image: &ImagePayload) -> Result<ImagePayload> {
        let id = Uuid::new_v4().simple();
        let input = self.temp_dir.join(format!(
            "instafy-bg-in-{}.{}",
            id,
            extension_for(image.mime_type())
        ));
        let output = self.temp_dir.join(format!("instafy-bg-out-{}.png", id));

        tokio::fs::write(&input, image.bytes()).await?;
        let result = self.run(&input, &output).await;

        for path in [&input, &output] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log::debug!("Ignoring cleanup failure {}: {}", path.display(), e);
            }
        }

        let bytes = result?;
        log::debug!(
            "{} removed background: {} -> {} bytes",
            self.program,
            image.len(),
            bytes.len()
        );
        ImagePayload::png(bytes).map_err(|_| {
            InstafyError::BackgroundRemovalError(format!("{} produced an empty image", self.program))
        })
    }
}
