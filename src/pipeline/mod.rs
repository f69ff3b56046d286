pub mod service;
pub mod state;

use std::sync::Arc;

use crate::{
    background::BackgroundRemover,
    error::{InstafyError, Result},
    logger,
    models::{find_pose, ArtifactKind, EditRequest, ImagePayload, PoseDescriptor},
};

pub use service::{EditService, HttpEditService};
pub use state::{InvalidTransition, PipelineEvent, PipelineState};

pub const COMPOSITE_PROMPT: &str = "Use the background from the second image (original user photo) and place the subject from the first image (white/plain background) onto it. Preserve the subject styling, align perspective and lighting naturally, avoid cropping, and output a single coherent composite.";

pub const EDIT_FALLBACK_ERROR: &str = "Failed to generate image";
pub const COMPOSITE_FALLBACK_ERROR: &str = "Failed to transfer background";

pub fn pose_prompt(pose: &PoseDescriptor) -> String {
    format!(
        "Convert the user image to have the pose from the sketch. Preserve the original subject, their expression, clothes, hair etc. Just change the pose. The new pose description is: {}\nPose Selected: {}",
        pose.description, pose.id
    )
}

/// Notified after every state change.
pub trait ProgressObserver: Send + Sync {
    fn on_state(&self, state: &PipelineState);
}

impl<F> ProgressObserver for F
where
    F: Fn(&PipelineState) + Send + Sync,
{
    fn on_state(&self, state: &PipelineState) {
        self(state)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub original: Option<ImagePayload>,
    pub background_removed: Option<ImagePayload>,
    pub instafied: Option<ImagePayload>,
    pub composite: Option<ImagePayload>,
}

impl Artifacts {
    pub fn get(&self, kind: ArtifactKind) -> Option<&ImagePayload> {
        match kind {
            ArtifactKind::Original => self.original.as_ref(),
            ArtifactKind::BackgroundRemoved => self.background_removed.as_ref(),
            ArtifactKind::Instafied => self.instafied.as_ref(),
            ArtifactKind::Composite => self.composite.as_ref(),
        }
    }
}

/// Drives upload → background removal → pose edit → composite, one run at a
/// time. Results of finished steps survive a later failure.
pub struct Pipeline {
    remover: Arc<dyn BackgroundRemover>,
    service: Arc<dyn EditService>,
    state: PipelineState,
    pose_id: Option<String>,
    artifacts: Artifacts,
    observers: Vec<Box<dyn ProgressObserver>>,
}

impl Pipeline {
    pub fn new(remover: Arc<dyn BackgroundRemover>, service: Arc<dyn EditService>) -> Self {
        Self {
            remover,
            service,
            state: PipelineState::Idle,
            pose_id: None,
            artifacts: Artifacts::default(),
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn pose_id(&self) -> Option<&str> {
        self.pose_id.as_deref()
    }

    /// New upload: drops every downstream result. A finished run returns to
    /// idle; an error stays visible until the next run.
    pub fn select_image(&mut self, image: ImagePayload) {
        self.artifacts = Artifacts {
            original: Some(image),
            ..Artifacts::default()
        };
        if self.state.transition(&PipelineEvent::Reset).is_ok() {
            if let Err(e) = self.apply(PipelineEvent::Reset) {
                log::debug!("Keeping state {}: {}", self.state, e);
            }
        }
    }

    /// Keeps the current upload and its results.
    pub fn select_pose(&mut self, id: &str) -> Result<&'static PoseDescriptor> {
        let pose = find_pose(id)
            .ok_or_else(|| InstafyError::ValidationError(format!("Unknown pose: {}", id)))?;
        self.pose_id = Some(pose.id.clone());
        Ok(pose)
    }

    pub fn can_run(&self) -> bool {
        self.artifacts.original.is_some() && self.pose_id.is_some() && !self.state.is_in_progress()
    }

    /// Runs every step from the start. On failure the state becomes
    /// `Error` and the error is returned.
    pub async fn run(&mut self) -> Result<&Artifacts> {
        if !self.can_run() {
            return Err(InstafyError::PipelineError(
                "Select an image and a pose before running".into(),
            ));
        }
        let original = self
            .artifacts
            .original
            .clone()
            .ok_or_else(|| InstafyError::InternalError("no image selected".into()))?;
        let pose = self
            .pose_id
            .as_deref()
            .and_then(find_pose)
            .ok_or_else(|| InstafyError::InternalError("no pose selected".into()))?;

        self.artifacts.instafied = None;
        self.artifacts.composite = None;
        self.apply(PipelineEvent::Start)?;

        let timer = logger::timer("pipeline run");
        let outcome = self.execute(&original, pose).await;
        drop(timer);

        match outcome {
            Ok(()) => Ok(&self.artifacts),
            Err(e) => {
                log::error!("Pipeline failed during {}: {}", self.state, e);
                self.apply(PipelineEvent::Failed(e.to_string()))?;
                Err(e)
            }
        }
    }

    async fn execute(&mut self, original: &ImagePayload, pose: &PoseDescriptor) -> Result<()> {
        let removed = self.remover.remove_background(original).await?;
        let removed_base64 = removed.to_base64();
        self.artifacts.background_removed = Some(removed);
        self.apply(PipelineEvent::BackgroundRemoved)?;

        self.apply(PipelineEvent::EditSubmitted)?;
        let edited_base64 = self
            .service
            .submit(EditRequest::base64(pose_prompt(pose), vec![removed_base64]))
            .await?
            .into_image(EDIT_FALLBACK_ERROR)?;
        self.artifacts.instafied = Some(ImagePayload::from_base64(&edited_base64, None)?);
        self.apply(PipelineEvent::EditCompleted)?;

        // Edited subject first, original upload second; the prompt relies on it.
        self.apply(PipelineEvent::CompositeSubmitted)?;
        let composite_base64 = self
            .service
            .submit(EditRequest::base64(
                COMPOSITE_PROMPT,
                vec![edited_base64, original.to_base64()],
            ))
            .await?
            .into_image(COMPOSITE_FALLBACK_ERROR)?;
        self.artifacts.composite = Some(ImagePayload::from_base64(&composite_base64, None)?);
        self.apply(PipelineEvent::CompositeCompleted)?;

        Ok(())
    }

    fn apply(&mut self, event: PipelineEvent) -> Result<()> {
        let next = self
            .state
            .transition(&event)
            .map_err(|e| InstafyError::InternalError(e.to_string()))?;
        log::debug!("Pipeline {} -> {}", self.state, next);
        self.state = next;
        for observer in &self.observers {
            observer.on_state(&self.state);
        }
        Ok(())
    }
}
