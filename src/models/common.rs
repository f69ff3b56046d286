use serde::{Deserialize, Serialize};

/// The four images a pipeline run can produce, in display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Original,
    BackgroundRemoved,
    Instafied,
    Composite,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Original,
        ArtifactKind::BackgroundRemoved,
        ArtifactKind::Instafied,
        ArtifactKind::Composite,
    ];

    /// File name used when the artifact is downloaded.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Original => "original.png",
            ArtifactKind::BackgroundRemoved => "background-removed.png",
            ArtifactKind::Instafied => "instafied.png",
            ArtifactKind::Composite => "instafied-over-background.png",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Original => "Original",
            ArtifactKind::BackgroundRemoved => "Background removed",
            ArtifactKind::Instafied => "Instafied",
            ArtifactKind::Composite => "Instafied over original background",
        }
    }
}
