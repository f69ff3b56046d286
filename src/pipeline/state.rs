use std::fmt;

use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong";

/// Progress of one pipeline run. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    RemovingBackground,
    BackgroundRemoved,
    SubmittingEdit,
    EditDone,
    SubmittingComposite,
    CompositeDone,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A run begins (or restarts).
    Start,
    BackgroundRemoved,
    EditSubmitted,
    EditCompleted,
    CompositeSubmitted,
    CompositeCompleted,
    Failed(String),
    /// A new image was selected after a finished run.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while {from}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub event: PipelineEvent,
}

impl PipelineState {
    /// Pure transition function. Forward steps only, `Failed` from any
    /// in-progress state, `Start` only from a resting state. `Reset` leaves
    /// `CompositeDone` only; `Error` is left by restarting.
    pub fn transition(&self, event: &PipelineEvent) -> Result<PipelineState, InvalidTransition> {
        use PipelineEvent as E;
        use PipelineState as S;

        let next = match (self, event) {
            (S::Idle | S::CompositeDone, E::Reset) => S::Idle,
            (S::Idle | S::CompositeDone | S::Error(_), E::Start) => S::RemovingBackground,
            (S::RemovingBackground, E::BackgroundRemoved) => S::BackgroundRemoved,
            (S::BackgroundRemoved, E::EditSubmitted) => S::SubmittingEdit,
            (S::SubmittingEdit, E::EditCompleted) => S::EditDone,
            (S::EditDone, E::CompositeSubmitted) => S::SubmittingComposite,
            (S::SubmittingComposite, E::CompositeCompleted) => S::CompositeDone,
            (state, E::Failed(message)) if state.is_in_progress() => {
                if message.trim().is_empty() {
                    S::Error(GENERIC_FAILURE.to_string())
                } else {
                    S::Error(message.clone())
                }
            }
            _ => {
                return Err(InvalidTransition {
                    from: self.clone(),
                    event: event.clone(),
                })
            }
        };
        Ok(next)
    }

    /// Between `Start` and the end of the run.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            PipelineState::RemovingBackground
                | PipelineState::BackgroundRemoved
                | PipelineState::SubmittingEdit
                | PipelineState::EditDone
                | PipelineState::SubmittingComposite
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PipelineState::Error(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::RemovingBackground => "removing-background",
            PipelineState::BackgroundRemoved => "background-removed",
            PipelineState::SubmittingEdit => "submitting-edit",
            PipelineState::EditDone => "edit-done",
            PipelineState::SubmittingComposite => "submitting-composite",
            PipelineState::CompositeDone => "composite-done",
            PipelineState::Error(_) => "error",
        }
    }

    /// User-facing progress line.
    pub fn progress_message(&self) -> String {
        match self {
            PipelineState::Idle => "Waiting for image and pose…".to_string(),
            PipelineState::RemovingBackground => "Step 1/4: Removing background…".to_string(),
            PipelineState::BackgroundRemoved => "Step 2/4: Background removed.".to_string(),
            PipelineState::SubmittingEdit => "Step 3/4: Generating instafied subject…".to_string(),
            PipelineState::EditDone => "Step 3/4 complete.".to_string(),
            PipelineState::SubmittingComposite => {
                "Step 4/4: Transferring original background…".to_string()
            }
            PipelineState::CompositeDone => "All steps complete!".to_string(),
            PipelineState::Error(message) => message.clone(),
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        PipelineState::Idle
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
