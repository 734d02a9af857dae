use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{RevisionRecord, WorkflowState};

/// The final outcome of a writer/editor run
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The editor approved the draft
    Approved {
        revisions: usize,
        draft: String,
        critique: String,
        #[serde(skip)]
        history: Vec<RevisionRecord>,
        total_duration_secs: f64,
    },
    /// Stopped after the revision threshold without approval
    RevisionLimitReached {
        revisions: usize,
        draft: String,
        critique: String,
        #[serde(skip)]
        history: Vec<RevisionRecord>,
        total_duration_secs: f64,
    },
    /// Cancelled by the host (e.g., Ctrl+C); the state is whatever was merged last
    UserInterrupted {
        revisions: usize,
        draft: String,
        critique: String,
        #[serde(skip)]
        history: Vec<RevisionRecord>,
        total_duration_secs: f64,
    },
}

impl LoopOutcome {
    pub fn approved(state: WorkflowState, history: Vec<RevisionRecord>, duration: Duration) -> Self {
        Self::Approved {
            revisions: state.revision_count,
            draft: state.draft,
            critique: state.critique,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn revision_limit_reached(
        state: WorkflowState,
        history: Vec<RevisionRecord>,
        duration: Duration,
    ) -> Self {
        Self::RevisionLimitReached {
            revisions: state.revision_count,
            draft: state.draft,
            critique: state.critique,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(
        state: WorkflowState,
        history: Vec<RevisionRecord>,
        duration: Duration,
    ) -> Self {
        Self::UserInterrupted {
            revisions: state.revision_count,
            draft: state.draft,
            critique: state.critique,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn revisions(&self) -> usize {
        match self {
            Self::Approved { revisions, .. } => *revisions,
            Self::RevisionLimitReached { revisions, .. } => *revisions,
            Self::UserInterrupted { revisions, .. } => *revisions,
        }
    }

    pub fn draft(&self) -> &str {
        match self {
            Self::Approved { draft, .. }
            | Self::RevisionLimitReached { draft, .. }
            | Self::UserInterrupted { draft, .. } => draft,
        }
    }

    pub fn critique(&self) -> &str {
        match self {
            Self::Approved { critique, .. }
            | Self::RevisionLimitReached { critique, .. }
            | Self::UserInterrupted { critique, .. } => critique,
        }
    }

    pub fn history(&self) -> &[RevisionRecord] {
        match self {
            Self::Approved { history, .. }
            | Self::RevisionLimitReached { history, .. }
            | Self::UserInterrupted { history, .. } => history,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        match self {
            Self::Approved {
                total_duration_secs,
                ..
            }
            | Self::RevisionLimitReached {
                total_duration_secs,
                ..
            }
            | Self::UserInterrupted {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// Status label shared by the JSON output and the transcript
    pub fn status(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::RevisionLimitReached { .. } => "revision_limit_reached",
            Self::UserInterrupted { .. } => "user_interrupted",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Approved { .. } => 0,
            Self::RevisionLimitReached { .. } => 1,
            Self::UserInterrupted { .. } => 130,
        }
    }
}
