//! Pose-transfer image editing.
//!
//! An uploaded photo has its background removed, the subject is re-posed by
//! a Gemini image model and finally placed back over the original
//! background. The model is reached through a small edit gateway that can
//! run as an HTTP service or in-process.

pub mod background;
pub mod config;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod presentation;

pub use background::BackgroundRemover;
pub use config::{Config, GeminiConfig, RemoverConfig};
pub use error::{InstafyError, Result};
pub use gateway::EditGateway;
pub use gemini::{GeminiClient, ImageEditor};
pub use models::{
    find_pose, pose_catalog, ArtifactKind, EditRequest, EditResponse, GatewayReply,
    GenerateContentResponse, ImagePayload, InlineImage, PoseDescriptor,
};
pub use pipeline::{EditService, HttpEditService, Pipeline, PipelineState};
