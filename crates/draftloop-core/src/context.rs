use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::state::{StateDelta, WorkflowState};

/// Bookkeeping for one run of the writer/editor loop
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Topic the first draft is written about
    pub topic: String,
    /// Current workflow state
    pub state: WorkflowState,
    /// Current iteration number (0-indexed)
    pub iteration: usize,
    /// One record per completed editor pass
    pub history: Vec<RevisionRecord>,
    started_at: Instant,
}

/// Record of a single writer/editor pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub revision: usize,
    pub draft: String,
    pub critique: String,
    pub route: String,
    pub writer_duration_secs: f64,
    pub editor_duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

impl LoopContext {
    pub fn new(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            run_id: Uuid::new_v4(),
            state: WorkflowState::new(topic.clone()),
            topic,
            iteration: 0,
            history: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Start from an existing draft instead of a bare topic
    pub fn with_initial_draft(mut self, draft: impl Into<String>) -> Self {
        self.state = WorkflowState::new(draft);
        self
    }

    /// Merge a node's delta into the running state
    pub fn apply(&mut self, delta: StateDelta) {
        let state = std::mem::take(&mut self.state);
        self.state = state.merge(delta);
    }

    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn push_record(&mut self, record: RevisionRecord) {
        self.history.push(record);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}
